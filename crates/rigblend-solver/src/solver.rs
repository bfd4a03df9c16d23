//! Snapshot to shape weights.
//!
//! [`WeightSolver`] owns an immutable [`CombinationModel`] and a simplex
//! cache. A solve evaluates every slider's progression, splits the active
//! sliders into regions, resolves isolated sliders directly and hands linked
//! regions to [`TriSpace`]. The channel weights that produces are then spread
//! over in-between tracks, and traversals add their shapes on top. Solving
//! only reads; structural edits go through [`WeightSolver::edit`], which swaps
//! in a fully rebuilt model or nothing.

use std::collections::BTreeMap;

use tracing::{debug, info, trace};

use rigblend_core::{
    CombinationModel, ConfigError, LibraryDefinition, ModelBuilder, RigError, ShapeId, ShapeWeight,
    Sign, Snapshot, SolverConfigError, WeightSolve,
};

use crate::config::SolverConfig;
use crate::region::regions;
use crate::simplex::SimplexCache;
use crate::traversal::{expand_inbetweens, solve_traversals};
use crate::trispace::TriSpace;

/// Sparse weights sorted by shape id, zero weights omitted.
pub type SolveOutput = Vec<ShapeWeight>;

#[derive(Debug)]
pub struct WeightSolver {
    model: CombinationModel,
    config: SolverConfig,
    cache: SimplexCache,
}

impl WeightSolver {
    pub fn new(model: CombinationModel, config: SolverConfig) -> Result<Self, SolverConfigError> {
        config.validate()?;
        let cache = SimplexCache::new(config.cache_capacity);
        Ok(Self { model, config, cache })
    }

    /// Build the model from a definition and validate the settings.
    pub fn from_definition(def: &LibraryDefinition, config: SolverConfig) -> Result<Self, RigError> {
        let model = def.build()?;
        Ok(Self::new(model, config)?)
    }

    pub fn with_defaults(model: CombinationModel) -> Self {
        let config = SolverConfig::default();
        let cache = SimplexCache::new(config.cache_capacity);
        Self { model, config, cache }
    }

    pub fn model(&self) -> &CombinationModel {
        &self.model
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Number of region simplices currently cached.
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    pub fn solve(&self, snapshot: &Snapshot) -> SolveOutput {
        let epsilon = self.config.activation_epsilon;
        let activations = self.model.activations(snapshot, epsilon);
        let mut sink = vec![0.0; self.model.shapes().len()];
        let tri = TriSpace::new(&self.model, &self.cache, epsilon);

        let found = regions(&self.model, &activations, epsilon);
        for region in &found {
            if region.is_isolated() {
                let slider = region.axes[0];
                let value = activations[slider.index()];
                if let Some(shape) = self.model.slider(slider).shape(Sign::of(value)) {
                    sink[shape.index()] += value.abs().min(1.0);
                }
                continue;
            }
            let values: Vec<f64> = region.axes.iter().map(|a| activations[a.index()]).collect();
            tri.solve_region(&region.axes, &values, &mut sink);
        }
        expand_inbetweens(&self.model, &mut sink);
        solve_traversals(&self.model, &activations, epsilon, &mut sink);

        let out: SolveOutput = sink
            .into_iter()
            .enumerate()
            .filter(|&(_, w)| w > 0.0)
            .map(|(i, w)| ShapeWeight {
                shape: ShapeId(i as u32),
                weight: w.min(1.0),
            })
            .collect();
        trace!(regions = found.len(), shapes = out.len(), "solver: solved");
        out
    }

    /// Solve and key the result by shape name.
    pub fn solve_named(&self, snapshot: &Snapshot) -> BTreeMap<String, f64> {
        self.solve(snapshot)
            .into_iter()
            .map(|w| (self.model.shape(w.shape).name().to_string(), w.weight))
            .collect()
    }

    /// Apply a structural edit as one transaction.
    ///
    /// The closure edits a builder seeded from the current model. The result
    /// replaces the model only if the closure and the rebuild both succeed;
    /// otherwise the current model is kept and the error returned.
    pub fn edit<F>(&mut self, f: F) -> Result<(), ConfigError>
    where
        F: FnOnce(&mut ModelBuilder) -> Result<(), ConfigError>,
    {
        let mut builder = self.model.to_builder();
        let rebuilt = f(&mut builder).and_then(|()| builder.build());
        match rebuilt {
            Ok(model) => {
                self.install(model);
                Ok(())
            }
            Err(e) => {
                debug!(error = %e, revision = self.model.revision(), "solver: edit rejected");
                Err(e)
            }
        }
    }

    /// Swap in a separately built model.
    pub fn replace_model(&mut self, model: CombinationModel) {
        self.install(model);
    }

    fn install(&mut self, model: CombinationModel) {
        self.model = model;
        self.cache.clear();
        info!(
            revision = self.model.revision(),
            shapes = self.model.shapes().len(),
            "solver: model installed"
        );
    }
}

impl WeightSolve for WeightSolver {
    fn solve(&self, snapshot: &Snapshot) -> Vec<ShapeWeight> {
        WeightSolver::solve(self, snapshot)
    }
}
