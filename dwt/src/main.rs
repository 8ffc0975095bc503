mod application;
mod logging;
mod presentation;

use dwt_core::error::Result;

fn main() -> Result<()> {
    application::run()
}
