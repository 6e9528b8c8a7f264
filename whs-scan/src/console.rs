//! Operator console input
//!
//! Each stdin line is either a `:`-prefixed operator command or decoded
//! camera text. Commands map one-to-one onto controller actions.

use crate::occupancy::OccupancyChoice;
use crate::session::{MoveStep, SessionState};
use whs_common::api::{Mode, UserRole};
use whs_common::events::{NoticeLevel, ScanEvent};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    SelectMode(Mode),
    Back,
    CameraOn,
    CameraOff,
    Undo,
    ClearLocation,
    Dismiss,
    Resolve(OccupancyChoice),
    SetRole(UserRole),
    /// Manual box entry, bypassing the camera
    SubmitBox(String),
    Status,
    Help,
    Quit,
    /// Decoded camera text
    Frame(String),
}

/// Console parse failure; the message is shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ParseError(pub String);

pub const HELP: &str = "\
Commands:
  :mode receive|ship|move   choose an action
  :back                     return to action selection
  :camera on|off            start or stop the camera
  :box <id>                 submit a box by hand
  :undo                     undo the last action
  :clear                    release the locked location
  :dismiss                  close the confirmation
  :assign | :different | :inspect
                            resolve an occupied-location prompt
  :role admin|employee      set the operator role
  :status                   show the session state
  :quit                     exit
Any other line is treated as decoded camera text.";

impl ConsoleCommand {
    /// Parse one input line; `None` for blank lines
    pub fn parse(line: &str) -> Option<Result<Self, ParseError>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Some(Ok(ConsoleCommand::Frame(line.to_string())));
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default().to_ascii_lowercase();
        let arg = parts.next();

        let parsed = match (name.as_str(), arg) {
            ("mode", Some(mode)) => Mode::parse(mode)
                .map(ConsoleCommand::SelectMode)
                .ok_or_else(|| ParseError(format!("Unknown mode: {}", mode))),
            ("mode", None) => Err(ParseError("Usage: :mode receive|ship|move".to_string())),
            ("back", _) => Ok(ConsoleCommand::Back),
            ("camera", Some(state)) => match state.to_ascii_lowercase().as_str() {
                "on" | "start" => Ok(ConsoleCommand::CameraOn),
                "off" | "stop" => Ok(ConsoleCommand::CameraOff),
                other => Err(ParseError(format!("Unknown camera state: {}", other))),
            },
            ("camera", None) => Err(ParseError("Usage: :camera on|off".to_string())),
            ("box", Some(box_id)) => Ok(ConsoleCommand::SubmitBox(box_id.to_string())),
            ("box", None) => Err(ParseError("Usage: :box <id>".to_string())),
            ("undo", _) => Ok(ConsoleCommand::Undo),
            ("clear", _) => Ok(ConsoleCommand::ClearLocation),
            ("dismiss", _) | ("next", _) => Ok(ConsoleCommand::Dismiss),
            ("assign", _) => Ok(ConsoleCommand::Resolve(OccupancyChoice::AssignAnyway)),
            ("different", _) => Ok(ConsoleCommand::Resolve(OccupancyChoice::ScanDifferent)),
            ("inspect", _) => Ok(ConsoleCommand::Resolve(OccupancyChoice::InspectContents)),
            ("role", Some(role)) => match role.to_ascii_uppercase().as_str() {
                "ADMIN" => Ok(ConsoleCommand::SetRole(UserRole::Admin)),
                "EMPLOYEE" => Ok(ConsoleCommand::SetRole(UserRole::Employee)),
                other => Err(ParseError(format!("Unknown role: {}", other))),
            },
            ("role", None) => Err(ParseError("Usage: :role admin|employee".to_string())),
            ("status", _) => Ok(ConsoleCommand::Status),
            ("help", _) | ("?", _) => Ok(ConsoleCommand::Help),
            ("quit", _) | ("exit", _) | ("q", _) => Ok(ConsoleCommand::Quit),
            (other, _) => Err(ParseError(format!("Unknown command: :{}", other))),
        };
        Some(parsed)
    }
}

/// One console line for an operator-visible event; `None` for events the
/// console does not show
pub fn render_event(event: &ScanEvent) -> Option<String> {
    let line = match event {
        ScanEvent::Notice { level, message, .. } => {
            let tag = match level {
                NoticeLevel::Success => "ok",
                NoticeLevel::Info => "info",
                NoticeLevel::Warning => "warn",
                NoticeLevel::Error => "error",
            };
            format!("[{}] {}", tag, message)
        }
        ScanEvent::ModeSelected { mode: Some(mode), .. } => format!("== {} ==", mode.title()),
        ScanEvent::ModeSelected { mode: None, .. } => "== Choose an action ==".to_string(),
        ScanEvent::CameraStateChanged { active, .. } => {
            format!("Camera {}", if *active { "on" } else { "off" })
        }
        ScanEvent::WrongScanType {
            expected, received, ..
        } => format!(
            "Wrong label: that is a {} QR code, scan the {} QR code",
            received, expected
        ),
        ScanEvent::OccupancyConflict {
            location_code,
            active_box_count,
            preview,
            more,
            ..
        } => {
            let mut text = format!(
                "Location {} already holds {} box(es):",
                location_code, active_box_count
            );
            for item in preview {
                text.push_str(&format!("\n  {}  {}", item.box_id, item.product_name));
            }
            if *more > 0 {
                text.push_str(&format!("\n  ... and {} more", more));
            }
            text.push_str("\n:assign anyway, :different location, or :inspect contents");
            text
        }
        ScanEvent::NavigateToInventory {
            location_id, status, ..
        } => format!("Inventory: location_id={} status={}", location_id, status),
        ScanEvent::EventRecorded {
            event,
            box_details,
            undoable,
            ..
        } => {
            let product = box_details
                .as_ref()
                .map(|d| d.product.display_name())
                .unwrap_or_else(|| event.product.display_name());
            let mut text = format!("Recorded {} {}", event.box_id, product);
            if let Some(lot) = &event.lot_code {
                text.push_str(&format!(" lot {}", lot));
            }
            if *undoable {
                text.push_str(" (:undo available)");
            }
            text
        }
        ScanEvent::StatsUpdated { stats, .. } => format!(
            "Today: received {} | to put away {} | moved {} | shipped {} | exceptions {}",
            stats.received_today,
            stats.to_put_away,
            stats.moved_today,
            stats.shipped_today,
            stats.exceptions_today
        ),
        ScanEvent::LocationLocked { .. }
        | ScanEvent::LocationCleared { .. }
        | ScanEvent::OccupancyPromptClosed { .. }
        | ScanEvent::ConfirmationDismissed { .. }
        | ScanEvent::UndoCompleted { .. }
        | ScanEvent::StatsRefreshRequested { .. } => return None,
    };
    Some(line)
}

/// Multi-line summary for `:status`
pub fn describe_state(state: &SessionState, role: UserRole) -> String {
    let mut lines = Vec::new();
    match state.mode() {
        Some(mode) => lines.push(format!("Mode: {}", mode)),
        None => lines.push("Mode: (choose an action)".to_string()),
    }
    if state.mode() == Some(Mode::Move) {
        let step = match state.move_step() {
            MoveStep::AwaitingLocation => "1 of 2 (location)",
            MoveStep::AwaitingBox => "2 of 2 (box)",
        };
        lines.push(format!("Step: {}", step));
    }
    if let Some(code) = state.pending_location_code() {
        lines.push(format!("Location: {}", code));
    }
    lines.push(format!(
        "Camera: {}",
        if state.camera_active() { "on" } else { "off" }
    ));
    if let Some(scan) = state.last_scanned() {
        lines.push(format!("Last scanned: {} {}", scan.kind, scan.id));
    }
    if let Some(prompt) = state.prompt() {
        lines.push(format!("{}: {}", prompt.title, prompt.instruction));
    }
    lines.push(format!(
        "Undo: {}",
        if state.undo_available() { "available" } else { "none" }
    ));
    lines.push(format!("Role: {:?}", role));
    lines.join("\n")
}
