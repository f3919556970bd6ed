use super::*;

#[test]
fn paths_match_portal_views() {
    assert_eq!(Route::Landing.path(), "/");
    assert_eq!(Route::Login.path(), "/login");
    assert_eq!(Route::Dashboard.path(), "/dashboard");
}

#[test]
fn default_route_is_landing() {
    assert_eq!(Route::default(), Route::Landing);
}

#[test]
fn display_is_path() {
    assert_eq!(Route::Login.to_string(), "/login");
}

#[test]
fn log_navigator_accepts_every_route() {
    for route in [Route::Landing, Route::Login, Route::Dashboard] {
        LogNavigator.navigate(route);
    }
}
