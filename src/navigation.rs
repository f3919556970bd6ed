//! Navigation targets the session manager sends the user to.
//!
//! SYSTEM CONTEXT
//! ==============
//! Login lands on the dashboard, registration on the login view, logout on
//! the landing page. The host UI decides what "navigate" means; the CLI just
//! logs it.

#[cfg(test)]
#[path = "navigation_test.rs"]
mod navigation_test;

use std::fmt;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Route {
    #[default]
    Landing,
    Login,
    Dashboard,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Landing => "/",
            Self::Login => "/login",
            Self::Dashboard => "/dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Host-provided view switcher.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless hosts: records the request in the log only.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(%route, "navigate");
    }
}
