//! `check` subcommand: parse a set-color payload the way the runtime would.

use neoring_lib::NeoringError;
use neoring_lib::envelope::{ActionKind, Envelope, SUBSCRIPTION_DATA_LEN};
use neoring_lib::led::SetColorCommand;

use super::{CheckOutput, Result, kv, kv_width, led};

/// Run `payload` through the envelope and the command parser.
///
/// Payloads that would be dropped as oversized are reported as errors.
pub(super) fn resolve(payload: &str) -> Result<SetColorCommand> {
    let env = Envelope::new(Some(ActionKind::Command), payload.as_bytes());
    if env.is_empty() {
        return Err(NeoringError::Payload(format!(
            "payload is {} bytes, the limit is {SUBSCRIPTION_DATA_LEN}",
            payload.len()
        )));
    }
    SetColorCommand::parse(env.payload())
}

pub(super) fn cmd_check(payload: &str, json: bool) -> Result<()> {
    let cmd = resolve(payload)?;
    let hex = led::format_color(cmd.color);

    if json {
        let output = CheckOutput {
            r: cmd.color.r,
            g: cmd.color.g,
            b: cmd.color.b,
            hex,
            action: if cmd.is_fade() { "fade" } else { "set" },
            time: cmd.time,
            length: payload.len(),
        };
        let text = serde_json::to_string_pretty(&output)
            .map_err(|e| NeoringError::Payload(e.to_string()))?;
        println!("{text}");
        return Ok(());
    }

    let w = kv_width(&["Color:", "Hex:", "Action:"], &[]);
    kv("Color:", cmd.color, w);
    kv("Hex:", &hex, w);
    if cmd.is_fade() {
        kv("Action:", format_args!("fade {}", cmd.time), w);
    } else {
        kv("Action:", "set", w);
    }
    Ok(())
}
