//! Integration tests for the allocation solver

use testresult::TestResult;

use outreach::{
    categories::{CATEGORY_COUNT, PROFILE_SOURCES},
    config::{CategoryBound, Coupling, PlanConfig},
    fixtures::{self, CampaignFixture},
    profiles::CategoryProfiles,
    solvers::{Allocation, Solver, SolverError, ilp::ILPSolver},
};

fn fixture_profiles(records: u32) -> Result<CategoryProfiles, Box<dyn std::error::Error>> {
    let dataset = CampaignFixture::new(records).dataset()?;

    Ok(CategoryProfiles::from_dataset(&dataset, &PROFILE_SOURCES)?)
}

fn open_plan() -> PlanConfig {
    PlanConfig {
        expected_records: None,
        bounds: Vec::new(),
        couplings: Vec::new(),
        ..PlanConfig::default()
    }
}

fn units(total: u64) -> f64 {
    u32::try_from(total).map_or(f64::MAX, f64::from)
}

fn assert_plan_holds(profiles: &CategoryProfiles, config: &PlanConfig, allocation: &Allocation) {
    for (record, size) in profiles.sizes().iter().enumerate() {
        let total = allocation.record_total(record);

        assert!(
            units(total) <= config.capacity_multiplier * size + 1e-6,
            "record {record} receives {total} items with size {size}"
        );
    }

    for bound in &config.bounds {
        let total = allocation.category_total(bound.category);

        assert!(
            (u64::from(bound.min)..=u64::from(bound.max)).contains(&total),
            "category {} total {total} outside [{}, {}]",
            bound.category,
            bound.min,
            bound.max
        );
    }

    for coupling in &config.couplings {
        assert!(
            allocation.category_total(coupling.dependent)
                <= allocation.category_total(coupling.anchor),
            "coupling {} <= {} violated",
            coupling.dependent,
            coupling.anchor
        );
    }
}

#[test]
fn small_plan_satisfies_every_rule() -> TestResult {
    let profiles = fixture_profiles(10)?;
    let config = fixtures::plan("./fixtures", "small")?;

    let allocation = ILPSolver::solve(&profiles, &config)?;

    assert_eq!(allocation.category_count(), CATEGORY_COUNT);
    assert_eq!(allocation.record_count(), 10);
    assert_plan_holds(&profiles, &config, &allocation);

    Ok(())
}

#[test]
fn reported_objective_matches_recomputed_revenue() -> TestResult {
    let profiles = fixture_profiles(10)?;
    let config = fixtures::plan("./fixtures", "small")?;

    let allocation = ILPSolver::solve(&profiles, &config)?;
    let revenue = allocation.revenue(&profiles);

    assert!(
        (allocation.objective() - revenue).abs() <= 1e-6 * revenue.abs().max(1.0),
        "objective {} differs from recomputed revenue {revenue}",
        allocation.objective()
    );
    assert!(revenue > 0.0, "a feasible plan with positive rates earns revenue");

    Ok(())
}

#[test]
fn unbounded_plan_fills_every_record_to_capacity() -> TestResult {
    let profiles = fixture_profiles(5)?;
    let config = open_plan();

    let allocation = ILPSolver::solve(&profiles, &config)?;

    // every unit revenue is positive, so capacity is the only binding rule
    for (record, size) in profiles.sizes().iter().enumerate() {
        let expected = (config.capacity_multiplier * size).round();

        assert!(
            (units(allocation.record_total(record)) - expected).abs() < 1e-6,
            "record {record} should be filled to {expected}"
        );
    }

    assert_plan_holds(&profiles, &config, &allocation);

    Ok(())
}

#[test]
fn single_record_is_capped_by_category_maximum() -> TestResult {
    let mut click_rates = vec![vec![0.0]; CATEGORY_COUNT];

    if let Some(row) = click_rates.get_mut(0) {
        *row = vec![0.5];
    }

    let profiles = CategoryProfiles::new(vec![2.0], click_rates, vec![vec![10.0]; CATEGORY_COUNT])?;

    let config = PlanConfig {
        bounds: vec![CategoryBound::new(0, 0, 4)],
        ..open_plan()
    };

    let allocation = ILPSolver::solve(&profiles, &config)?;

    assert_eq!(allocation.quantity(0, 0), Some(4));
    assert!((allocation.objective() - 40.0).abs() < 1e-6, "4 units at 10 each");

    Ok(())
}

#[test]
fn coupling_limits_dependent_category() -> TestResult {
    let mut click_rates = vec![vec![0.0]; CATEGORY_COUNT];
    let mut order_values = vec![vec![0.0]; CATEGORY_COUNT];

    for (category, rate, value) in [(7, 1.0, 5.0), (3, 0.1, 1.0)] {
        if let (Some(r), Some(v)) = (click_rates.get_mut(category), order_values.get_mut(category)) {
            *r = vec![rate];
            *v = vec![value];
        }
    }

    let profiles = CategoryProfiles::new(vec![10.0], click_rates, order_values)?;

    let config = PlanConfig {
        bounds: vec![CategoryBound::new(3, 0, 2)],
        couplings: vec![Coupling::new(7, 3)],
        ..open_plan()
    };

    let allocation = ILPSolver::solve(&profiles, &config)?;

    // category 7 earns 50 per unit but may not exceed category 3's two units
    assert_eq!(allocation.category_total(7), 2);
    assert_eq!(allocation.category_total(3), 2);
    assert!((allocation.objective() - 102.0).abs() < 1e-6, "2 * 50 + 2 * 1");

    Ok(())
}

#[test]
fn zero_sizes_allocate_nothing() -> TestResult {
    let profiles = CategoryProfiles::new(
        vec![0.0; 3],
        vec![vec![0.5; 3]; CATEGORY_COUNT],
        vec![vec![10.0; 3]; CATEGORY_COUNT],
    )?;

    let allocation = ILPSolver::solve(&profiles, &open_plan())?;

    assert!(allocation.iter().all(|(_, _, quantity)| quantity == 0));
    assert!(allocation.objective().abs() < 1e-9, "nothing can be sent");

    Ok(())
}

#[test]
fn zero_sizes_with_minimums_are_infeasible() -> TestResult {
    let profiles = CategoryProfiles::new(
        vec![0.0; 3],
        vec![vec![0.5; 3]; CATEGORY_COUNT],
        vec![vec![10.0; 3]; CATEGORY_COUNT],
    )?;

    let config = PlanConfig {
        bounds: vec![CategoryBound::new(5, 1, 10)],
        ..open_plan()
    };

    let result = ILPSolver::solve(&profiles, &config);

    assert!(matches!(result, Err(SolverError::ResolutionError(_))));

    Ok(())
}

#[test]
fn inverted_bound_is_reported_by_the_solver() -> TestResult {
    let profiles = fixture_profiles(4)?;

    let config = PlanConfig {
        bounds: vec![CategoryBound::new(1, 9, 3)],
        ..open_plan()
    };

    let result = ILPSolver::solve(&profiles, &config);

    assert!(matches!(result, Err(SolverError::ResolutionError(_))));

    Ok(())
}

#[test]
fn reference_minimums_are_infeasible_for_tiny_campaigns() -> TestResult {
    let profiles = fixture_profiles(3)?;

    let config = PlanConfig {
        expected_records: None,
        ..PlanConfig::default()
    };

    let result = ILPSolver::solve(&profiles, &config);

    assert!(matches!(result, Err(SolverError::ResolutionError(_))));

    Ok(())
}
