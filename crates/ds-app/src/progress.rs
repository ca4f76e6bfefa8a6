#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStage {
    LoadingScenario,
    CheckingCache,
    LoadingCachedResult,
    Compiling,
    Running,
    SavingResults,
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct SimProgressInfo {
    pub sim_time_s: f64,
    pub t_stop_s: f64,
    pub fraction_complete: f64,
    pub step: usize,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub sim: Option<SimProgressInfo>,
}

impl RunProgressEvent {
    pub fn stage(stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            stage,
            elapsed_wall_s,
            message,
            sim: None,
        }
    }
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingScenario => "loading",
            RunStage::CheckingCache => "cache-check",
            RunStage::LoadingCachedResult => "cache-load",
            RunStage::Compiling => "compile",
            RunStage::Running => "run",
            RunStage::SavingResults => "save",
            RunStage::Completed => "done",
        }
    }
}
