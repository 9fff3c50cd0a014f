//! Builtin commands.

mod cd;
mod clr;
mod echo;
mod fg;
mod help;
mod jobs;
mod kill;
mod quit;

use super::ToolRegistry;

/// Register every builtin into `registry`.
pub fn register_builtins(registry: &mut ToolRegistry) {
    registry.register(cd::Cd);
    registry.register(clr::Clr);
    registry.register(echo::Echo);
    registry.register(fg::Fg);
    registry.register(help::Help);
    registry.register(jobs::Jobs);
    registry.register(kill::Kill);
    registry.register(quit::Quit);
}
