//! Correlator: reconciles recorded keystroke counts against final document
//! length without ever accessing keystroke content. Pure function; no I/O.

const DEFAULT_EDIT_RATIO: f64 = 0.15;
const MIN_KEYSTROKES: f64 = 10.0;
const MIN_DOCUMENT_LENGTH: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Insufficient,
    Consistent,
    Suspicious,
    Inconsistent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    NoKeystrokes,
    ExternalGenerated,
    HighEditRatio,
    Autocomplete,
    UndetectedPaste,
    ExcessContent,
}

#[derive(Debug, Clone)]
pub struct Report {
    pub status: Status,
    pub effective_keystrokes: f64,
    pub expected_content: f64,
    pub discrepancy: f64,
    pub ratio: Option<f64>,
    pub flags: Vec<Flag>,
}

#[derive(Debug, Clone, Copy)]
pub struct Input {
    pub document_length: f64,
    pub total_keystrokes: f64,
    pub detected_paste_chars: f64,
    pub autocomplete_chars: f64,
    pub suspicious_bursts: u32,
    pub edit_ratio: Option<f64>,
}

pub fn correlate(input: Input) -> Report {
    let edit_ratio = input.edit_ratio.unwrap_or(DEFAULT_EDIT_RATIO);
    let effective_keystrokes = input.total_keystrokes * (1.0 - edit_ratio);
    let expected_content = effective_keystrokes + input.detected_paste_chars + input.autocomplete_chars;
    let discrepancy = input.document_length - expected_content;
    let ratio = if expected_content > 0.0 {
        Some(discrepancy / expected_content)
    } else {
        None
    };

    let mut flags = Vec::new();

    let status = if input.total_keystrokes < MIN_KEYSTROKES && input.document_length < MIN_DOCUMENT_LENGTH {
        Status::Insufficient
    } else if expected_content == 0.0 && input.document_length > 0.0 {
        flags.push(Flag::NoKeystrokes);
        flags.push(Flag::ExternalGenerated);
        Status::Inconsistent
    } else {
        let r = ratio.unwrap_or(0.0).abs();
        if r >= 0.5 {
            Status::Inconsistent
        } else if r >= 0.3 {
            Status::Suspicious
        } else {
            Status::Consistent
        }
    };

    if let Some(r) = ratio {
        if discrepancy < 0.0 && r.abs() >= 0.3 {
            flags.push(Flag::HighEditRatio);
        }
        if r >= 0.3 {
            flags.push(Flag::ExcessContent);
        }
    }
    if input.suspicious_bursts > 0 {
        flags.push(Flag::Autocomplete);
    }
    if discrepancy > 100.0 && input.detected_paste_chars == 0.0 {
        flags.push(Flag::UndetectedPaste);
    }

    Report {
        status,
        effective_keystrokes,
        expected_content,
        discrepancy,
        ratio,
        flags,
    }
}
