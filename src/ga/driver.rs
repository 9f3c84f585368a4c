//! Generational search over candidate delivery plans.
//!
//! # Algorithm
//!
//! 1. Validate settings and demand.
//! 2. Seed the population (random, from a seed plan, or from carried-over
//!    plans extended with new orders).
//! 3. Each generation: keep the best plan unchanged, then breed children by
//!    tournament selection, crossover and mutation until the population is
//!    full. Infeasible children are dropped and the slot is retried. An
//!    infeasible random member fails the run.
//! 4. Stop after `max_generations`, or after `patience` generations whose
//!    best improved by no more than `min_improvement`.
//! 5. Commit the best plan's capacity state to the shared state.
//!
//! Breeding jobs carry their own RNG seed, so parallel and sequential
//! breeding produce the same children for the same seed.
//!
//! # Reference
//! Goldberg (1989), "Genetic Algorithms in Search, Optimization and Machine
//! Learning", Ch. 3: tournament selection and elitism.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::{CancelToken, Individual, PlanKpi, PlanningContext};
use crate::capacity::{CapacityState, SharedCapacity};
use crate::config::{GaConfig, PlannerConfig};
use crate::error::{PlanningError, Result};
use crate::models::{Network, Order};
use crate::validation::{validate_hubs, validate_orders};

/// Why the generational loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    MaxGenerations,
    /// `patience` generations without enough improvement.
    Stagnation,
}

/// Result of a planning run.
#[derive(Debug, Clone)]
pub struct PlanOutcome {
    /// Best plan found; its capacity state has been committed.
    pub best: Individual,
    /// Generations actually run.
    pub generations: usize,
    /// Best fitness after seeding, then after each generation. Never
    /// decreases.
    pub best_fitness_history: Vec<f64>,
    pub stop_reason: StopReason,
    /// Carried-over plans that survived order insertion.
    pub carried_over: usize,
}

impl PlanOutcome {
    pub fn kpi(&self) -> PlanKpi {
        PlanKpi::calculate(&self.best)
    }
}

/// One child to breed.
#[derive(Debug, Clone, Copy)]
struct BreedJob {
    parent_a: usize,
    /// `None` breeds by mutation alone.
    parent_b: Option<usize>,
    /// Mutate the bred child once more.
    mutate_after: bool,
    seed: u64,
}

/// Genetic route planner over a fixed network.
///
/// # Example
/// ```no_run
/// use u_airfreight::{GaConfig, GeneticPlanner, Network, Order, PlannerConfig, SharedCapacity};
///
/// # fn demo(network: Network, orders: Vec<Order>) -> u_airfreight::Result<()> {
/// let config = PlannerConfig::default();
/// let shared = SharedCapacity::new(&network);
/// let mut planner = GeneticPlanner::new(&network, &config, GaConfig::default().with_seed(7), orders);
/// let outcome = planner.run(&shared)?;
/// println!("fitness {}", outcome.best.fitness());
/// # Ok(())
/// # }
/// ```
pub struct GeneticPlanner<'a> {
    network: &'a Network,
    config: &'a PlannerConfig,
    ga: GaConfig,
    demand: Vec<Order>,
    cancel: Option<CancelToken>,
    population: Vec<Individual>,
    /// Holds the last run started from, before any of its plans.
    base: Option<CapacityState>,
}

impl<'a> GeneticPlanner<'a> {
    pub fn new(
        network: &'a Network,
        config: &'a PlannerConfig,
        ga: GaConfig,
        demand: Vec<Order>,
    ) -> Self {
        Self {
            network,
            config,
            ga,
            demand,
            cancel: None,
            population: Vec::new(),
            base: None,
        }
    }

    /// Observes `token` between orders and generations.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn demand(&self) -> &[Order] {
        &self.demand
    }

    /// Final population of the last successful run, best first.
    pub fn population_snapshot(&self) -> &[Individual] {
        &self.population
    }

    /// Plans the whole demand from the shared capacity state and commits
    /// the best plan.
    ///
    /// # Errors
    /// Invalid input, an order no random plan can place on time,
    /// cancellation, or a broken capacity invariant. Nothing is committed
    /// on error.
    pub fn run(&mut self, shared: &SharedCapacity) -> Result<PlanOutcome> {
        self.validate()?;
        let mut rng = self.rng();
        let ctx = self.context();
        let base = shared.snapshot();
        info!(
            orders = self.demand.len(),
            population = self.ga.population_size,
            "planning run started"
        );
        let population = self.fill_random(&ctx, &base, Vec::new(), &mut rng)?;
        let (outcome, population) = self.evolve_and_commit(&ctx, shared, population, 0, &mut rng)?;
        self.population = population;
        self.base = Some(base);
        Ok(outcome)
    }

    /// Like [`run`](Self::run), with `seed` and one mutation of it in the
    /// initial population. Random members are built on the holds `seed`
    /// was built on.
    pub fn run_seeded(&mut self, shared: &SharedCapacity, seed: &Individual) -> Result<PlanOutcome> {
        self.validate()?;
        let mut rng = self.rng();
        let ctx = self.context();
        let base = seed.base_capacity(&ctx)?;

        let mut population = vec![seed.clone()];
        if self.ga.population_size > 1 {
            match Individual::mutate(&ctx, seed, &self.demand, self.ga.mutation_fraction, &mut rng) {
                Ok(child) => population.push(child),
                Err(e) if e.is_infeasibility() => debug!(error = %e, "seed mutation dropped"),
                Err(e) => return Err(e),
            }
        }
        info!(orders = self.demand.len(), "seeded planning run started");
        let population = self.fill_random(&ctx, &base, population, &mut rng)?;
        let (outcome, population) = self.evolve_and_commit(&ctx, shared, population, 0, &mut rng)?;
        self.population = population;
        self.base = Some(base);
        Ok(outcome)
    }

    /// Adds `new_orders` to the demand and re-plans, starting from
    /// `carry_over` plans extended with the orders they lack.
    ///
    /// Carried plans that cannot take the new orders are dropped. Random
    /// members are built on the holds the carried plans were built on,
    /// else on the base of this planner's previous run, else on the shared
    /// state.
    pub fn run_incremental(
        &mut self,
        shared: &SharedCapacity,
        carry_over: Vec<Individual>,
        new_orders: &[Order],
    ) -> Result<PlanOutcome> {
        let known: HashSet<_> = self.demand.iter().map(|o| o.id.clone()).collect();
        self.demand.extend(
            new_orders
                .iter()
                .filter(|o| !known.contains(&o.id))
                .cloned(),
        );
        self.validate()?;
        let mut rng = self.rng();
        let ctx = self.context();

        let mut population = Vec::with_capacity(self.ga.population_size);
        for individual in carry_over.iter().take(self.ga.population_size) {
            if let Some(extended) = individual.try_insert_orders(&ctx, &self.demand, &mut rng)? {
                population.push(extended);
            }
        }
        let carried = population.len();
        info!(
            orders = self.demand.len(),
            offered = carry_over.len(),
            carried,
            "incremental planning run started"
        );

        let base = match (population.first().or(carry_over.first()), &self.base) {
            (Some(plan), _) => plan.base_capacity(&ctx)?,
            (None, Some(previous)) => previous.clone(),
            (None, None) => shared.snapshot(),
        };
        let population = self.fill_random(&ctx, &base, population, &mut rng)?;
        let (outcome, population) =
            self.evolve_and_commit(&ctx, shared, population, carried, &mut rng)?;
        self.population = population;
        self.base = Some(base);
        Ok(outcome)
    }

    fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.ga.validate()?;
        if self.demand.is_empty() {
            return Err(PlanningError::EmptyDemand);
        }
        let mut errors = validate_orders(self.network, &self.demand).err().unwrap_or_default();
        errors.extend(validate_hubs(self.network, self.config).err().unwrap_or_default());
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PlanningError::InvalidInput(errors))
        }
    }

    fn rng(&self) -> SmallRng {
        match self.ga.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        }
    }

    fn context(&self) -> PlanningContext<'_> {
        let ctx = PlanningContext::new(self.network, self.config);
        match &self.cancel {
            Some(token) => ctx.with_cancel(token),
            None => ctx,
        }
    }

    /// Tops `population` up with random plans built on `base`. The first
    /// order a random plan cannot place fails the run.
    fn fill_random(
        &self,
        ctx: &PlanningContext<'_>,
        base: &CapacityState,
        mut population: Vec<Individual>,
        rng: &mut SmallRng,
    ) -> Result<Vec<Individual>> {
        while population.len() < self.ga.population_size {
            population.push(Individual::random(ctx, base, &self.demand, rng)?);
        }
        Ok(population)
    }

    fn evolve_and_commit(
        &self,
        ctx: &PlanningContext<'_>,
        shared: &SharedCapacity,
        mut population: Vec<Individual>,
        carried_over: usize,
        rng: &mut SmallRng,
    ) -> Result<(PlanOutcome, Vec<Individual>)> {
        sort_best_first(&mut population);
        let mut best = population[0].clone();
        let mut history = vec![best.fitness()];
        let mut stale = 0usize;
        let mut generations = 0usize;
        let mut stop_reason = StopReason::MaxGenerations;

        for generation in 1..=self.ga.max_generations {
            ctx.check_cancelled()?;
            population = self.next_generation(ctx, &population, &best, rng)?;
            sort_best_first(&mut population);
            generations = generation;

            let improvement = population[0].fitness() - best.fitness();
            if improvement > 0.0 {
                best = population[0].clone();
            }
            history.push(best.fitness());
            if improvement > self.ga.min_improvement {
                stale = 0;
            } else {
                stale += 1;
            }
            debug!(generation, best = best.fitness(), stale, "generation done");

            if self.ga.patience > 0 && stale >= self.ga.patience {
                stop_reason = StopReason::Stagnation;
                break;
            }
        }

        ctx.check_cancelled()?;
        best.apply_to(shared);
        info!(
            generations,
            fitness = best.fitness(),
            ?stop_reason,
            "planning run finished"
        );
        Ok((
            PlanOutcome {
                best,
                generations,
                best_fitness_history: history,
                stop_reason,
                carried_over,
            },
            population,
        ))
    }

    /// Elite first, then bred children. Falls back to elite clones when
    /// the breeding budget runs out.
    fn next_generation(
        &self,
        ctx: &PlanningContext<'_>,
        population: &[Individual],
        best: &Individual,
        rng: &mut SmallRng,
    ) -> Result<Vec<Individual>> {
        let size = self.ga.population_size;
        let mut next = Vec::with_capacity(size);
        next.push(best.clone());

        let budget = (size - 1) * self.ga.max_breeding_attempts_factor;
        let mut attempts = 0;
        while next.len() < size && attempts < budget {
            let batch = (size - next.len()).min(budget - attempts);
            attempts += batch;
            let jobs: Vec<BreedJob> = (0..batch).map(|_| self.plan_job(population, rng)).collect();
            next.extend(self.breed(ctx, population, jobs)?);
        }
        next.truncate(size);

        if next.len() < size {
            warn!(
                bred = next.len() - 1,
                wanted = size - 1,
                "breeding budget exhausted, padding with elite clones"
            );
            let mut i = 0;
            while next.len() < size {
                next.push(population[i % population.len()].clone());
                i += 1;
            }
        }
        Ok(next)
    }

    fn plan_job(&self, population: &[Individual], rng: &mut SmallRng) -> BreedJob {
        let parent_a = tournament(population, self.ga.tournament_size, rng);
        let parent_b = if rng.random_bool(self.ga.crossover_rate) {
            Some(tournament(population, self.ga.tournament_size, rng))
        } else {
            None
        };
        let mutate_after = rng.random_bool(self.ga.mutation_rate);
        BreedJob {
            parent_a,
            parent_b,
            mutate_after,
            seed: rng.random(),
        }
    }

    fn breed(
        &self,
        ctx: &PlanningContext<'_>,
        population: &[Individual],
        jobs: Vec<BreedJob>,
    ) -> Result<Vec<Individual>> {
        let breed_one = |job: BreedJob| self.breed_one(ctx, population, job);
        let results: Vec<Result<Option<Individual>>> = if self.ga.parallel {
            jobs.into_par_iter().map(breed_one).collect()
        } else {
            jobs.into_iter().map(breed_one).collect()
        };
        results.into_iter().filter_map(|r| r.transpose()).collect()
    }

    /// `Ok(None)` when the child cannot be placed.
    fn breed_one(
        &self,
        ctx: &PlanningContext<'_>,
        population: &[Individual],
        job: BreedJob,
    ) -> Result<Option<Individual>> {
        let mut rng = SmallRng::seed_from_u64(job.seed);
        let parent_a = &population[job.parent_a];
        let bred = match job.parent_b {
            Some(b) => Individual::crossover(
                ctx,
                parent_a,
                &population[b],
                &self.demand,
                self.ga.crossover_fraction,
                &mut rng,
            ),
            None => Individual::mutate(
                ctx,
                parent_a,
                &self.demand,
                self.ga.mutation_fraction,
                &mut rng,
            ),
        };
        let child = match bred {
            Ok(child) => child,
            Err(e) if e.is_infeasibility() => {
                debug!(error = %e, "child dropped");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if !job.mutate_after {
            return Ok(Some(child));
        }
        match Individual::mutate(ctx, &child, &self.demand, self.ga.mutation_fraction, &mut rng) {
            Ok(mutant) => Ok(Some(mutant)),
            Err(e) if e.is_infeasibility() => {
                debug!(error = %e, "second mutation dropped, keeping child");
                Ok(Some(child))
            }
            Err(e) => Err(e),
        }
    }
}

/// Index of the fittest of `size` uniformly drawn members.
fn tournament<R: Rng + ?Sized>(population: &[Individual], size: usize, rng: &mut R) -> usize {
    let mut winner = rng.random_range(0..population.len());
    for _ in 1..size {
        let challenger = rng.random_range(0..population.len());
        if population[challenger].fitness() > population[winner].fitness() {
            winner = challenger;
        }
    }
    winner
}

fn sort_best_first(population: &mut [Individual]) {
    population.sort_by(|a, b| b.fitness().total_cmp(&a.fitness()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{order, planner_config, sample_network};
    use crate::validation::{audit_holds, audit_individual};

    fn demand() -> Vec<Order> {
        vec![
            order("O1", "SKBO", 12),
            order("O2", "LOWW", 8),
            order("O3", "SEQM", 5),
        ]
    }

    fn small_ga() -> GaConfig {
        GaConfig::default()
            .with_population_size(8)
            .with_max_generations(6)
            .with_seed(42)
    }

    #[test]
    fn test_run_commits_best() {
        let network = sample_network();
        let config = planner_config();
        let shared = SharedCapacity::new(&network);
        let mut planner = GeneticPlanner::new(&network, &config, small_ga(), demand());

        let outcome = planner.run(&shared).unwrap();
        assert!(outcome.generations >= 1);
        assert_eq!(outcome.best_fitness_history.len(), outcome.generations + 1);
        assert!(outcome
            .best_fitness_history
            .windows(2)
            .all(|w| w[1] >= w[0]));
        assert!(audit_individual(&network, &config, planner.demand(), &outcome.best).is_empty());
        assert_eq!(planner.population_snapshot().len(), 8);
        assert_eq!(
            planner.population_snapshot()[0].fitness(),
            outcome.best.fitness()
        );

        let committed = shared.snapshot();
        let mut ours: Vec<_> = outcome.best.capacity().ledger.entries().collect();
        let mut theirs: Vec<_> = committed.ledger.entries().collect();
        ours.sort();
        theirs.sort();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_same_seed_same_result() {
        let network = sample_network();
        let config = planner_config();
        let a = GeneticPlanner::new(&network, &config, small_ga(), demand())
            .run(&SharedCapacity::new(&network))
            .unwrap();
        let b = GeneticPlanner::new(&network, &config, small_ga().with_parallel(true), demand())
            .run(&SharedCapacity::new(&network))
            .unwrap();
        assert_eq!(a.best_fitness_history, b.best_fitness_history);
        assert_eq!(a.best.plans(), b.best.plans());
    }

    #[test]
    fn test_empty_demand_rejected() {
        let network = sample_network();
        let config = planner_config();
        let shared = SharedCapacity::new(&network);
        let err = GeneticPlanner::new(&network, &config, small_ga(), Vec::new())
            .run(&shared)
            .unwrap_err();
        assert!(matches!(err, PlanningError::EmptyDemand));
    }

    #[test]
    fn test_invalid_orders_rejected() {
        let network = sample_network();
        let config = planner_config();
        let shared = SharedCapacity::new(&network);
        let err = GeneticPlanner::new(&network, &config, small_ga(), vec![order("X", "ZZZZ", 1)])
            .run(&shared)
            .unwrap_err();
        assert!(matches!(err, PlanningError::InvalidInput(ref e) if e.len() == 1));
        assert!(shared.snapshot().ledger.is_empty());
    }

    #[test]
    fn test_cancelled_run_commits_nothing() {
        let network = sample_network();
        let config = planner_config();
        let shared = SharedCapacity::new(&network);
        let token = CancelToken::new();
        token.cancel();
        let err = GeneticPlanner::new(&network, &config, small_ga(), demand())
            .with_cancel_token(token)
            .run(&shared)
            .unwrap_err();
        assert!(matches!(err, PlanningError::Cancelled));
        assert!(shared.snapshot().ledger.is_empty());
        assert!(shared.snapshot().tracker.is_empty());
    }

    #[test]
    fn test_stagnation_stops_early() {
        let network = sample_network();
        let config = planner_config().with_production_hubs(["EBCI"]);
        let shared = SharedCapacity::new(&network);
        // Only zero-hop plans exist: fitness never moves
        let ga = small_ga().with_max_generations(50).with_patience(2);
        let outcome = GeneticPlanner::new(&network, &config, ga, vec![order("L", "EBCI", 3)])
            .run(&shared)
            .unwrap();
        assert_eq!(outcome.stop_reason, StopReason::Stagnation);
        assert_eq!(outcome.generations, 2);
    }

    #[test]
    fn test_seeded_run_never_worse_than_seed() {
        let network = sample_network();
        let config = planner_config();
        let first = GeneticPlanner::new(&network, &config, small_ga(), demand())
            .run(&SharedCapacity::new(&network))
            .unwrap();

        let shared = SharedCapacity::new(&network);
        let mut planner = GeneticPlanner::new(&network, &config, small_ga().with_seed(9), demand());
        let outcome = planner.run_seeded(&shared, &first.best).unwrap();
        assert!(outcome.best.fitness() >= first.best.fitness());
        assert!(audit_individual(&network, &config, planner.demand(), &outcome.best).is_empty());
    }

    #[test]
    fn test_incremental_extends_carried_plans() {
        let network = sample_network();
        let config = planner_config();
        let shared = SharedCapacity::new(&network);
        let mut planner = GeneticPlanner::new(&network, &config, small_ga(), demand());
        planner.run(&shared).unwrap();
        let carry = planner.population_snapshot().to_vec();

        let extra = vec![order("O4", "EBCI", 6), order("O1", "SKBO", 12)];
        let outcome = planner.run_incremental(&shared, carry, &extra).unwrap();
        assert_eq!(planner.demand().len(), 4);
        assert!(outcome.carried_over > 0);
        assert_eq!(outcome.best.plans().len(), 4);
        // Ledger holds exactly the segments of the four plans
        assert!(audit_individual(&network, &config, planner.demand(), &outcome.best).is_empty());
    }

    #[test]
    fn test_incremental_without_carry_over_books_once() {
        let network = sample_network();
        let config = planner_config();
        let empty = CapacityState::new(&network);
        let shared = SharedCapacity::new(&network);
        let mut planner = GeneticPlanner::new(&network, &config, small_ga(), demand());
        let first = planner.run(&shared).unwrap();
        assert!(audit_holds(&network, &empty, &first.best).is_empty());

        let outcome = planner
            .run_incremental(&shared, Vec::new(), &[order("O4", "EBCI", 6)])
            .unwrap();
        assert_eq!(outcome.carried_over, 0);
        assert_eq!(outcome.best.plans().len(), 4);
        assert!(audit_individual(&network, &config, planner.demand(), &outcome.best).is_empty());
        // Seats held are exactly the seats the four plans fly
        assert!(audit_holds(&network, &empty, &outcome.best).is_empty());

        let committed = shared.snapshot();
        let mut theirs: Vec<_> = committed.ledger.entries().collect();
        let mut ours: Vec<_> = outcome.best.capacity().ledger.entries().collect();
        theirs.sort();
        ours.sort();
        assert_eq!(ours, theirs);
    }

    #[test]
    fn test_mutation_roll_applies_to_every_child() {
        let network = sample_network();
        let config = planner_config();
        let ctx = PlanningContext::new(&network, &config);
        let base = CapacityState::new(&network);
        let mut rng = SmallRng::seed_from_u64(42);
        let population: Vec<Individual> = (0..4)
            .map(|_| Individual::random(&ctx, &base, &demand(), &mut rng).unwrap())
            .collect();

        let never = small_ga().with_rates(0.0, 0.0);
        let planner = GeneticPlanner::new(&network, &config, never, demand());
        for _ in 0..20 {
            let job = planner.plan_job(&population, &mut rng);
            assert!(job.parent_b.is_none());
            assert!(!job.mutate_after);
        }

        let always = small_ga().with_rates(0.0, 1.0);
        let planner = GeneticPlanner::new(&network, &config, always, demand());
        for _ in 0..20 {
            let job = planner.plan_job(&population, &mut rng);
            assert!(job.parent_b.is_none());
            assert!(job.mutate_after);
            let child = planner.breed_one(&ctx, &population, job).unwrap().unwrap();
            assert!(audit_individual(&network, &config, &demand(), &child).is_empty());
        }
    }

    #[test]
    fn test_unplaceable_order_fails_run() {
        let network = sample_network();
        let config = planner_config().with_production_hubs(["SPIM"]);
        let shared = SharedCapacity::new(&network);
        let mut orders = demand();
        let due = crate::test_fixtures::t0() + chrono::Duration::hours(1);
        orders.push(order("late", "LOWW", 2).with_due_at(due));
        let err = GeneticPlanner::new(&network, &config, small_ga(), orders)
            .run(&shared)
            .unwrap_err();
        assert!(matches!(
            err,
            PlanningError::SlaViolated { ref order_id, .. } if order_id.as_ref() == "late"
        ));
        assert!(shared.snapshot().ledger.is_empty());
        assert!(shared.snapshot().tracker.is_empty());
    }

    #[test]
    fn test_tournament_prefers_fitter() {
        let network = sample_network();
        let config = planner_config();
        let ctx = PlanningContext::new(&network, &config);
        let base = CapacityState::new(&network);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut population: Vec<Individual> = (0..5)
            .map(|_| Individual::random(&ctx, &base, &demand(), &mut rng).unwrap())
            .collect();
        sort_best_first(&mut population);
        // A tournament over the whole population many times finds the best
        let top = population[0].fitness();
        let winner = (0..50)
            .map(|_| tournament(&population, 20, &mut rng))
            .map(|i| population[i].fitness())
            .fold(f64::MIN, f64::max);
        assert_eq!(winner, top);
    }
}
