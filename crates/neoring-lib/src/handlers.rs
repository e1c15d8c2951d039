//! Query and command handlers run by the workers.
//!
//! Both handlers touch the ring only through [`SharedRing::try_with`]. If the
//! lock is contended the handler skips its device work for this cycle; the
//! next inbound event is the retry. Errors never leave a handler.

use std::sync::Arc;

use crate::envelope::SUBSCRIPTION_DATA_LEN;
use crate::led::{Rgb, SetColorCommand, SharedRing, StatusPayload};
use crate::transport::Publisher;

/// Handler signature: context, copied payload bytes, reported length.
pub type Handler = fn(&HandlerContext, &[u8], u16);

/// Everything a handler may touch.
#[derive(Clone)]
pub struct HandlerContext {
    pub ring: Arc<SharedRing>,
    pub publisher: Arc<dyn Publisher>,
    pub status_topic: String,
}

fn oversized(name: &str, length: u16) -> bool {
    if usize::from(length) > SUBSCRIPTION_DATA_LEN {
        log::warn!("{name}: data is larger than max length ({length} bytes), can not parse");
        return true;
    }
    false
}

fn trace(name: &str, payload: &[u8], length: u16) {
    log::debug!(
        "{name}: data {:?}, length {length}",
        String::from_utf8_lossy(payload)
    );
}

/// Query: read the current color and publish it.
///
/// If the ring is busy or the read fails, the last recorded color is
/// published instead.
pub fn get_color(ctx: &HandlerContext, payload: &[u8], length: u16) {
    if oversized("get_color", length) {
        return;
    }
    trace("get_color", payload, length);

    match ctx.ring.try_with(|ring| ring.read_color()) {
        Some(Ok(color)) => ctx.ring.record(color),
        Some(Err(e)) => log::warn!("get_color: {e}"),
        None => log::debug!("get_color: ring busy, skipping status read"),
    }

    publish_status(ctx, ctx.ring.snapshot());
}

/// Command: parse, set or fade under the ring lock, then publish status once.
pub fn set_color(ctx: &HandlerContext, payload: &[u8], length: u16) {
    if oversized("set_color", length) {
        return;
    }
    trace("set_color", payload, length);

    let cmd = match SetColorCommand::parse(payload) {
        Ok(cmd) => cmd,
        Err(e) => {
            log::warn!("set_color: {e}");
            return;
        }
    };

    let applied = ctx.ring.try_with(|ring| {
        if cmd.is_fade() {
            ring.fade_color(cmd.color, cmd.time)?;
        } else {
            ring.set_color(cmd.color)?;
        }
        ring.read_color()
    });
    match applied {
        Some(Ok(color)) => ctx.ring.record(color),
        Some(Err(e)) => log::warn!("set_color: {e}"),
        None => log::debug!("set_color: ring busy, dropping {}", cmd.color),
    }

    publish_status(ctx, ctx.ring.snapshot());
}

/// Publish `color` on the status topic.
pub fn publish_status(ctx: &HandlerContext, color: Rgb) {
    let json = match StatusPayload::from(color).to_json() {
        Ok(json) => json,
        Err(e) => {
            log::warn!("status: could not serialize {color}: {e}");
            return;
        }
    };
    if let Err(e) = ctx.publisher.publish(&ctx.status_topic, json.as_bytes()) {
        log::warn!("status: {e}");
    }
}
