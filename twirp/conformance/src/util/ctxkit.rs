//! Caller identity carried in the request context.

use super::twirp::Context;

/// Id of the authenticated caller, `0` when there is none.
pub fn get_user_id(ctx: &Context) -> i64 {
    ctx.user_id
}

pub fn with_user_id(mut ctx: Context, user_id: i64) -> Context {
    ctx.user_id = user_id;
    ctx
}
