//! Built-in names installed into the global frame before user code runs.
//!
//! Every chapter gets the basic natives and constants; chapter 2 and above
//! add pairs and lists.

mod list;
mod misc;


use sable_ir::Chapter;

use crate::context::Context;

/// Install the prelude for `ctx`'s chapter.
pub fn install_prelude(ctx: &mut Context) {
    misc::install(ctx);
    if ctx.chapter() >= Chapter::TWO {
        list::install(ctx);
    }
    tracing::trace!(chapter = %ctx.chapter(), "prelude installed");
}
