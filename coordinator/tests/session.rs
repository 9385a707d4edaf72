mod common;

use common::*;
use coordinator::{
    PipelineError, PipelineState, configs::SolverConfig, launch, launch_with,
};
use stages::Role;

#[test]
fn session_runs_until_the_budget_is_spent() {
    let mut session = launch_with(run_config(3), MockSolver::new()).unwrap();
    assert_eq!(session.sizes(), Some(expected_sizes(3)));

    let first = session.evaluate(&ACCEPTED).unwrap().unwrap();
    let rejected = session.evaluate(&NEGATIVE_BOUNDARY).unwrap().unwrap();
    let last = session.evaluate(&ACCEPTED).unwrap().unwrap();

    assert_eq!(first, last);
    assert_eq!(rejected, vec![-1.0; 2]);
    assert_eq!(session.state(), PipelineState::Terminated);
    assert!(matches!(
        session.evaluate(&ACCEPTED),
        Err(PipelineError::Terminated)
    ));

    let mut signal = ACCEPTED;
    signal[0] = f64::INFINITY;
    assert_eq!(session.evaluate(&signal).unwrap(), None);
}

#[test]
fn session_terminates_on_request() {
    let mut session = launch_with(run_config(10), MockSolver::new()).unwrap();
    session.evaluate(&ACCEPTED).unwrap();

    session.terminate().unwrap();
    assert_eq!(session.state(), PipelineState::Terminated);
}

#[test]
fn launch_requires_a_solver_command() {
    let err = launch(run_config(3)).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
}

#[test]
fn launch_reports_a_missing_solver_binary() {
    let mut config = run_config(3);
    config.solver = Some(SolverConfig {
        command: "/nonexistent/spectrum-solver".into(),
        args: Vec::new(),
        timeout_secs: None,
    });

    match launch(config).err().unwrap() {
        PipelineError::StageFailed { role, .. } => assert_eq!(role, Role::Solver),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_config_fails_before_any_stage_starts() {
    let mut config = run_config(3);
    config.fit.molecules.push("CH4".into());

    let err = launch_with(config, MockSolver::new()).err().unwrap();
    assert!(matches!(err, PipelineError::InvalidConfig(_)));
}
