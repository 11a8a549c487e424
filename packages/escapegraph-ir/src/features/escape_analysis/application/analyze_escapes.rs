//! Escape analysis use case
//!
//! Runs batches bottom-up, wave by wave. Batches of the same wave only read
//! summaries from earlier waves, so with the `parallel` feature they are
//! analyzed on a dedicated rayon pool. Outputs are merged in batch order,
//! which keeps reports identical between sequential and parallel runs.

use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, info};

use crate::config::{validated, EscapeConfig};
use crate::errors::{EscapeGraphError, EscapeResult};
use crate::features::escape_analysis::domain::{
    AllocDecision, EscapeReport, LocAttrs, SiteDecision, SummaryStore,
};
use crate::features::escape_analysis::infrastructure::{
    plan_batches, Batch, BatchOutput, BatchPlan, DecisionEmitter, GraphSolver,
    LocationGraphBuilder,
};
use crate::features::escape_analysis::ports::{EscapeAnalyzerPort, SummaryProvider};
use crate::features::ir::{Program, Site};

pub struct EscapeAnalysisService {
    config: EscapeConfig,
    #[cfg(feature = "parallel")]
    pool: Option<rayon::ThreadPool>,
}

impl EscapeAnalysisService {
    pub fn new(config: EscapeConfig) -> EscapeResult<Self> {
        let config = validated(config)?;

        #[cfg(feature = "parallel")]
        let pool = if config.enable_parallel {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(config.effective_threads())
                .thread_name(|i| format!("escapegraph-worker-{}", i))
                .build()
                .map_err(|e| EscapeGraphError::internal(format!("thread pool: {}", e)))?;
            Some(pool)
        } else {
            None
        };

        Ok(Self {
            config,
            #[cfg(feature = "parallel")]
            pool,
        })
    }

    pub fn config(&self) -> &EscapeConfig {
        &self.config
    }

    /// Analyze a whole program
    pub fn analyze(&self, program: &Program) -> EscapeResult<EscapeReport> {
        let start = Instant::now();
        let plan = plan_batches(program);
        info!(
            "escape analysis: {} functions, {} batches, {} waves",
            program.functions().len(),
            plan.batches.len(),
            plan.waves.len()
        );

        let mut report = EscapeReport::default();
        for (w, wave) in plan.waves.iter().enumerate() {
            let outputs = self.run_wave(program, &plan, wave, &report.summaries)?;
            debug!("wave {}: {} batches done", w, outputs.len());
            for output in outputs {
                merge(&mut report, output)?;
            }
        }

        for global in program.globals() {
            let site = Site::Var(global.id);
            report.decisions.insert(
                site,
                SiteDecision {
                    site,
                    func: None,
                    decision: AllocDecision::Heap,
                    attrs: LocAttrs::ALL,
                    transient: false,
                },
            );
            report.stats.heap_sites += 1;
        }

        let stats = &mut report.stats;
        stats.functions = program.functions().len();
        stats.batches = plan.batches.len();
        stats.recursive_batches = plan.batches.iter().filter(|b| b.recursive).count();
        stats.waves = plan.waves.len();
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "escape analysis done in {}ms: {} heap, {} stack, {} walks",
            stats.duration_ms, stats.heap_sites, stats.stack_sites, stats.walks
        );
        Ok(report)
    }

    fn run_wave(
        &self,
        program: &Program,
        plan: &BatchPlan,
        wave: &[usize],
        summaries: &SummaryStore,
    ) -> EscapeResult<Vec<BatchOutput>> {
        #[cfg(feature = "parallel")]
        if let Some(pool) = &self.pool {
            if wave.len() >= self.config.parallel_threshold {
                return pool.install(|| {
                    wave.par_iter()
                        .map(|&b| analyze_batch(program, &plan.batches[b], summaries, &self.config))
                        .collect()
                });
            }
        }

        wave.iter()
            .map(|&b| analyze_batch(program, &plan.batches[b], summaries, &self.config))
            .collect()
    }
}

impl EscapeAnalyzerPort for EscapeAnalysisService {
    fn analyze(&self, program: &Program) -> EscapeResult<EscapeReport> {
        EscapeAnalysisService::analyze(self, program)
    }
}

/// Build, solve and emit one batch against already finalized summaries
pub fn analyze_batch(
    program: &Program,
    batch: &Batch,
    summaries: &dyn SummaryProvider,
    config: &EscapeConfig,
) -> EscapeResult<BatchOutput> {
    let record = config.diagnostic_level >= 2;

    let mut graph = LocationGraphBuilder::new(program, batch, summaries)
        .precise_recursive_calls(config.precise_recursive_calls)
        .record_notes(record)
        .build()?;

    let solved = GraphSolver::new(program, &mut graph)
        .max_walk_rounds(config.max_walk_rounds)
        .record_paths(record)
        .walk_all();

    let mut output = DecisionEmitter::new(program, batch, &graph)
        .diagnostic_level(config.diagnostic_level)
        .emit();
    output.stats.walks = solved.walks;
    if solved.round_limit_hit {
        output.stats.round_limit_hits = 1;
    }

    debug!(
        "batch {} [{}]{}: {} locations, {} edges, {} walks",
        batch.index,
        batch
            .roots
            .iter()
            .map(|f| program.func_name(*f))
            .collect::<Vec<_>>()
            .join(", "),
        if batch.recursive { " (recursive)" } else { "" },
        output.stats.locations,
        output.stats.edges,
        output.stats.walks
    );
    Ok(output)
}

fn merge(report: &mut EscapeReport, output: BatchOutput) -> EscapeResult<()> {
    for decision in output.decisions {
        report.decisions.insert(decision.site, decision);
    }
    for summary in output.summaries {
        report.summaries.insert(summary)?;
    }
    report.diagnostics.extend(output.diagnostics);
    report.stats.merge(&output.stats);
    Ok(())
}
