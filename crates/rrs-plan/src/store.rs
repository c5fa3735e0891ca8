use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rrs_schemas::PlanRecord;

/// The durable state the Plan Service's snapshot store persists: every
/// known plan, keyed by `plan_id`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanStoreState {
    pub plans: BTreeMap<String, PlanRecord>,
}
