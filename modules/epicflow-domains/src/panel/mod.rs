// Panel builder: submit a query, load chart series.

pub mod actions;
pub mod epics;
pub mod state;


use std::sync::Arc;

use epicflow_engine::{combine_epics, CombinedEpic};

use crate::traits::PanelDataSource;
pub use actions::PanelAction;
pub use epics::{AcknowledgeEpic, QueryEpic};
pub use state::{PanelReducer, PanelState};

/// Every panel epic, combined over one upstream.
pub fn panel_epic(source: Arc<dyn PanelDataSource>) -> CombinedEpic<PanelAction> {
    combine_epics::<PanelAction>(vec![])
        .named("panel")
        .with(QueryEpic::new(source))
        .with(AcknowledgeEpic)
}
