pub mod orchestrator;
pub mod queue;
pub mod recognition;
pub mod status;
pub mod storage;
pub mod synthesis;
pub mod validation;
