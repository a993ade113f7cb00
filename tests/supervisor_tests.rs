mod common;

use common::*;
use gmsafety::config::GM_PARAM_HW_CAM;
use gmsafety::*;

fn gm_supervisor(param: u16) -> SafetySupervisor {
    let mut supervisor = SafetySupervisor::new();
    supervisor.set_safety_mode(SafetyMode::Gm, param);
    supervisor
}

#[test]
fn test_starts_in_no_output() {
    let mut supervisor = SafetySupervisor::new();

    assert_eq!(supervisor.mode(), None);
    assert!(matches!(supervisor.model(), SafetyModel::NoOutput(_)));

    assert!(supervisor.rx(&wheel_speed_msg(50, 50)));
    assert!(!supervisor.state().vehicle_moving);
    assert!(!supervisor.tx(&steer_cmd(0)));
    assert_eq!(supervisor.fwd(0, &wheel_speed_msg(0, 0)), None);
}

#[test]
fn test_mode_selection_from_raw() {
    let mut supervisor = SafetySupervisor::new();

    assert_eq!(
        supervisor.set_safety_mode_raw(99, 0),
        Err(SafetyError::UnknownSafetyMode(99))
    );
    assert_eq!(supervisor.mode(), None);

    assert!(supervisor.set_safety_mode_raw(4, GM_PARAM_HW_CAM).is_ok());
    assert_eq!(supervisor.mode(), Some(SafetyMode::Gm));
    assert_eq!(supervisor.param(), GM_PARAM_HW_CAM);
    assert_eq!(supervisor.context().rx_checks.checks().len(), 7);

    assert!(supervisor.set_safety_mode_raw(19, 0).is_ok());
    assert_eq!(supervisor.mode(), Some(SafetyMode::NoOutput));
    assert!(supervisor.context().rx_checks.checks().is_empty());
}

#[test]
fn test_mode_change_resets_state() {
    let mut supervisor = gm_supervisor(PARAM_CAM);
    supervisor.rx(&gas_pedal_msg(0, true));
    supervisor.rx(&interceptor_msg(0));
    assert!(supervisor.state().controls_allowed);
    assert!(supervisor.state().gas_interceptor_detected);

    supervisor.set_safety_mode(SafetyMode::Gm, PARAM_CAM);
    assert_eq!(*supervisor.state(), VehicleSafetyState::default());
    assert_eq!(supervisor.stats(), SafetyStats::default());
}

#[test]
fn test_driver_torque_then_oversized_steer() {
    let mut supervisor = gm_supervisor(PARAM_ASCM);

    assert!(supervisor.rx(&torque_driver_msg(-50)));
    assert!(supervisor.state().torque_driver.values().contains(&-50));
    assert!(!supervisor.tx(&steer_cmd(400)));
}

#[test]
fn test_interceptor_report_sets_gas_pressed() {
    let mut supervisor = gm_supervisor(PARAM_ASCM);

    assert!(supervisor.rx(&frame(513, 0, &[0x02, 0x08, 0x02, 0x08, 0, 0])));
    assert!(supervisor.state().gas_pressed);
    assert_eq!(supervisor.state().gas_interceptor_prev, 520);
}

#[test]
fn test_engaged_session_end_to_end() {
    let mut supervisor = gm_supervisor(PARAM_CAM);

    supervisor.set_timestamp(10_000);
    supervisor.rx(&wheel_speed_msg(400, 400));
    supervisor.rx(&gas_pedal_msg(0, true));
    assert!(supervisor.state().controls_allowed);

    assert!(supervisor.tx(&steer_cmd(10)));
    assert!(supervisor.tx(&steer_cmd(20)));
    assert!(supervisor.tx(&button_cmd(0, 2)));
    assert_eq!(supervisor.fwd(2, &frame(384, 2, &[0; 4])), None);
    assert_eq!(supervisor.fwd(2, &frame(789, 2, &[0; 5])), Some(0));

    // Driver taps the gas: everything nonzero is blocked again
    supervisor.rx(&gas_pedal_msg(40, true));
    assert!(!supervisor.state().controls_allowed);
    assert!(!supervisor.tx(&steer_cmd(10)));
    assert!(supervisor.tx(&steer_cmd(0)));
}

#[test]
fn test_relay_malfunction_blocks_everything() {
    let mut supervisor = gm_supervisor(PARAM_CAM);
    supervisor.tick(100_000);
    supervisor.tick(200_000);

    // Stock LKAS on the powertrain bus means the harness relay is stuck
    supervisor.rx(&steer_cmd(0));
    assert!(supervisor.state().relay_malfunction);

    assert!(!supervisor.tx(&steer_cmd(0)));
    assert!(!supervisor.tx(&button_cmd(0, 6)));
    assert_eq!(supervisor.fwd(0, &wheel_speed_msg(0, 0)), None);

    // Latched for the session
    supervisor.rx(&wheel_speed_msg(0, 0));
    assert!(supervisor.state().relay_malfunction);
}

#[test]
fn test_relay_transition_grace() {
    let mut supervisor = gm_supervisor(PARAM_CAM);
    supervisor.tick(100_000);

    supervisor.rx(&steer_cmd(0));
    assert!(!supervisor.state().relay_malfunction);
    assert!(supervisor.tx(&steer_cmd(0)));
}

#[test]
fn test_lagging_rx_revokes_controls() {
    let mut supervisor = gm_supervisor(PARAM_CAM);
    supervisor.rx(&gas_pedal_msg(0, true));
    assert!(supervisor.state().controls_allowed);

    supervisor.tick(500_000);
    assert!(supervisor.state().controls_allowed);
    assert!(supervisor.context().rx_checks.checks().iter().all(|c| !c.lagging));

    supervisor.tick(2_000_000);
    assert!(!supervisor.state().controls_allowed);
    assert!(supervisor.context().rx_checks.checks().iter().all(|c| c.lagging));
}

#[test]
fn test_lag_clears_when_traffic_resumes() {
    let mut supervisor = gm_supervisor(PARAM_ASCM);
    supervisor.tick(2_000_000);
    assert!(supervisor.context().rx_checks.checks()[1].lagging);

    supervisor.set_timestamp(2_100_000);
    supervisor.rx(&wheel_speed_msg(0, 0));
    let checks = supervisor.context().rx_checks.checks();
    assert!(!checks[1].lagging);
    assert_eq!(checks[1].last_timestamp_us, 2_100_000);
}

#[test]
fn test_stats_counting() {
    let mut supervisor = gm_supervisor(PARAM_CAM);

    supervisor.rx(&wheel_speed_msg(0, 0));
    supervisor.rx(&frame(842, 0, &[0; 8]));
    supervisor.tx(&steer_cmd(0));
    supervisor.tx(&steer_cmd(50));
    supervisor.tx(&frame(0x7FF, 0, &[0; 8]));
    supervisor.fwd(0, &wheel_speed_msg(0, 0));
    supervisor.fwd(0, &torque_driver_msg(0));

    let stats = supervisor.stats();
    assert_eq!(stats.rx_frames, 2);
    assert_eq!(stats.rx_invalid, 1);
    assert_eq!(stats.tx_frames, 3);
    assert_eq!(stats.tx_blocked, 2);
    assert_eq!(stats.fwd_frames, 1);
}

#[test]
fn test_context_serializes() {
    let mut supervisor = gm_supervisor(PARAM_CAM);
    supervisor.rx(&wheel_speed_msg(20, 0));

    let json = serde_json::to_value(supervisor.context()).unwrap();
    assert_eq!(json["state"]["vehicle_moving"], true);
    assert_eq!(json["rx_checks"]["checks"].as_array().map(Vec::len), Some(7));
}
