//! CLI command handlers.

mod reconcile_once;
mod run;

pub use reconcile_once::run_reconcile_once;
pub use run::run_core;

use std::sync::Arc;

use crate::config::CoreConfig;
use crate::engine::ExecutionCore;
use crate::orders::OrderStore;
use crate::paper::{PaperPlacer, PaperVenue};
use crate::venue::{OrderPlacer, VenueRegistry};

/// Build an `ExecutionCore` wired to one paper venue per configured name.
pub fn paper_core(config: CoreConfig) -> (ExecutionCore, Vec<Arc<PaperVenue>>) {
    let venues: Vec<Arc<PaperVenue>> = config
        .paper_venues
        .iter()
        .map(|name| Arc::new(PaperVenue::new(name.as_str())))
        .collect();

    let mut registry = VenueRegistry::new();
    for venue in &venues {
        registry.register(venue.name(), venue.clone());
    }

    let placer_venues = venues.clone();
    let core = ExecutionCore::new(config, registry, move |store: Arc<OrderStore>| {
        let placer = placer_venues
            .into_iter()
            .fold(PaperPlacer::new(store), PaperPlacer::with_venue);
        Arc::new(placer) as Arc<dyn OrderPlacer>
    });
    (core, venues)
}
