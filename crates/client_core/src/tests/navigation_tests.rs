use super::*;

fn no_pairs(len: usize) -> PairingPlanner<impl Fn(usize) -> bool> {
    PairingPlanner::new(len, DeviceClass::Desktop, |_| false)
}

#[test]
fn device_class_boundaries() {
    assert_eq!(DeviceClass::from_viewport_width(375), DeviceClass::Mobile);
    assert_eq!(DeviceClass::from_viewport_width(767), DeviceClass::Mobile);
    assert_eq!(DeviceClass::from_viewport_width(768), DeviceClass::Tablet);
    assert_eq!(DeviceClass::from_viewport_width(1023), DeviceClass::Tablet);
    assert_eq!(DeviceClass::from_viewport_width(1024), DeviceClass::Desktop);
}

#[test]
fn midpoint_belongs_to_the_right_half() {
    assert_eq!(PointerSide::from_position(499.9, 1000.0), PointerSide::Left);
    assert_eq!(PointerSide::from_position(500.0, 1000.0), PointerSide::Right);
}

#[test]
fn initial_state_is_first_slide_pointer_left() {
    let nav = NavigationController::default();
    assert_eq!(nav.current_index(), 0);
    assert_eq!(nav.pointer_side(), PointerSide::Left);
    assert!(!nav.is_suspended_over_control());
}

#[test]
fn click_follows_pointer_side() {
    let planner = no_pairs(4);
    let mut nav = NavigationController::new(DeviceClass::Desktop);

    nav.pointer_moved(900.0, 1000.0);
    assert!(nav.click(&planner));
    assert_eq!(nav.current_index(), 1);

    nav.pointer_moved(100.0, 1000.0);
    assert!(nav.click(&planner));
    assert!(nav.click(&planner));
    assert_eq!(nav.current_index(), 3);
}

#[test]
fn clicks_over_video_controls_do_not_navigate() {
    let planner = no_pairs(3);
    let mut nav = NavigationController::new(DeviceClass::Desktop);
    nav.pointer_moved(900.0, 1000.0);
    nav.set_over_video_controls(true);

    nav.pointer_moved(10.0, 1000.0);
    assert_eq!(nav.pointer_side(), PointerSide::Right);
    assert!(!nav.click(&planner));
    assert_eq!(nav.current_index(), 0);

    nav.set_over_video_controls(false);
    assert!(nav.click(&planner));
    assert_eq!(nav.current_index(), 1);
}

#[test]
fn pointer_input_is_ignored_off_desktop() {
    let planner = PairingPlanner::new(3, DeviceClass::Mobile, |_| false);
    let mut nav = NavigationController::new(DeviceClass::Mobile);
    nav.pointer_moved(900.0, 1000.0);
    assert_eq!(nav.pointer_side(), PointerSide::Left);
    assert!(!nav.click(&planner));

    nav.advance(&planner);
    assert_eq!(nav.current_index(), 1);
    nav.retreat(&planner);
    nav.retreat(&planner);
    assert_eq!(nav.current_index(), 2);
}

#[test]
fn arrow_keys_map_to_advance_and_retreat() {
    let planner = no_pairs(3);
    let mut nav = NavigationController::default();
    nav.key(
        NavigationKey::from_key_name("ArrowRight").expect("key"),
        &planner,
    );
    assert_eq!(nav.current_index(), 1);
    nav.key(NavigationKey::ArrowLeft, &planner);
    nav.key(NavigationKey::ArrowLeft, &planner);
    assert_eq!(nav.current_index(), 2);
    assert_eq!(NavigationKey::from_key_name("Enter"), None);
}

#[test]
fn goto_wraps_and_clamp_keeps_index_in_range() {
    let mut nav = NavigationController::default();
    nav.goto(7, 5);
    assert_eq!(nav.current_index(), 2);

    nav.clamp_to(2);
    assert_eq!(nav.current_index(), 0);

    nav.goto(1, 2);
    nav.clamp_to(0);
    assert_eq!(nav.current_index(), 0);

    nav.goto(3, 0);
    assert_eq!(nav.current_index(), 0);
}
