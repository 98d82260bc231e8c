pub mod panel;
pub mod sentiment;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod types;

pub use traits::{AnalysisService, PanelDataSource};
pub use types::{
    AnalysisResult, Point, QueryResults, ResultState, Sentiment, Task, TaskId, TaskStatus,
};
