mod common;

use common::*;

const ACC_MSGS: [u32; 3] = [789, 715, 880];

#[test]
fn test_ascm_never_forwards() {
    let harness = Harness::new(PARAM_ASCM);

    for bus in 0..4 {
        for addr in [189, 384, 388, 452, 481, 789, 842] {
            assert_eq!(harness.fwd(bus, &frame(addr, bus, &[0; 8])), None);
        }
    }
}

#[test]
fn test_cam_powertrain_to_camera() {
    let harness = Harness::new(PARAM_CAM);

    assert_eq!(harness.fwd(0, &frame(842, 0, &[0; 5])), Some(2));
    assert_eq!(harness.fwd(0, &frame(481, 0, &[0; 7])), Some(2));
    assert_eq!(harness.fwd(0, &frame(0x7FF, 0, &[0; 8])), Some(2));

    // Driver torque report is substituted by the assistance computer
    assert_eq!(harness.fwd(0, &frame(388, 0, &[0; 8])), None);
}

#[test]
fn test_cam_camera_to_powertrain() {
    let harness = Harness::new(PARAM_CAM);

    // Stock lane keeping is always replaced
    assert_eq!(harness.fwd(2, &frame(384, 2, &[0; 4])), None);

    // Stock longitudinal is kept
    for addr in ACC_MSGS {
        assert_eq!(harness.fwd(2, &frame(addr, 2, &[0; 8])), Some(0), "addr {}", addr);
    }
    assert_eq!(harness.fwd(2, &frame(388, 2, &[0; 8])), Some(0));
}

#[test]
fn test_cam_long_drops_stock_acc() {
    let harness = Harness::new(PARAM_CAM_LONG);

    for addr in ACC_MSGS {
        assert_eq!(harness.fwd(2, &frame(addr, 2, &[0; 8])), None, "addr {}", addr);
    }
    assert_eq!(harness.fwd(2, &frame(384, 2, &[0; 4])), None);
    assert_eq!(harness.fwd(2, &frame(1000, 2, &[0; 8])), Some(0));
    assert_eq!(harness.fwd(0, &frame(789, 0, &[0; 5])), Some(2));
}

#[test]
fn test_cam_other_buses_not_forwarded() {
    let harness = Harness::new(PARAM_CAM);

    assert_eq!(harness.fwd(1, &frame(842, 1, &[0; 5])), None);
    assert_eq!(harness.fwd(3, &frame(842, 3, &[0; 5])), None);
}

#[test]
fn test_forwarding_ignores_vehicle_state() {
    let mut harness = Harness::new(PARAM_CAM);
    let report = frame(842, 0, &[0; 5]);
    let before = harness.fwd(0, &report);

    harness.rx(&gas_pedal_msg(0, true));
    harness.rx(&ascm_brake_msg(true));
    assert_eq!(harness.fwd(0, &report), before);
}
