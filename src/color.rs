use rgb::RGB8;

/// Column palette used by the rainbow mode of both renderers, left to right.
pub const RAINBOW: [RGB8; 12] = [
    RGB8::new(0x45, 0x8a, 0xc6),
    RGB8::new(0x00, 0xa9, 0xd7),
    RGB8::new(0x00, 0xc6, 0xce),
    RGB8::new(0x2a, 0xde, 0xb0),
    RGB8::new(0x9c, 0xef, 0x8a),
    RGB8::new(0xf9, 0xf8, 0x71),
    RGB8::new(0xff, 0xe1, 0x71),
    RGB8::new(0xff, 0xca, 0x80),
    RGB8::new(0xff, 0xb8, 0x96),
    RGB8::new(0xe4, 0x98, 0x9b),
    RGB8::new(0xb8, 0x81, 0x9c),
    RGB8::new(0x84, 0x6f, 0x91),
];

/// Rainbow-mode colours of the four minute dots, first dot first.
pub const MINUTE_ACCENTS: [RGB8; 4] = [
    RGB8::new(0xe4, 0x98, 0x9b),
    RGB8::new(0x45, 0x8a, 0xc6),
    RGB8::new(0x00, 0xc6, 0xce),
    RGB8::new(0x84, 0x6f, 0x91),
];

const NAMED: &[(&str, RGB8)] = &[
    ("black", RGB8::new(0, 0, 0)),
    ("white", RGB8::new(255, 255, 255)),
    ("red", RGB8::new(255, 0, 0)),
    ("lime", RGB8::new(0, 255, 0)),
    ("green", RGB8::new(0, 128, 0)),
    ("blue", RGB8::new(0, 0, 255)),
    ("yellow", RGB8::new(255, 255, 0)),
    ("cyan", RGB8::new(0, 255, 255)),
    ("aqua", RGB8::new(0, 255, 255)),
    ("magenta", RGB8::new(255, 0, 255)),
    ("fuchsia", RGB8::new(255, 0, 255)),
    ("orange", RGB8::new(255, 165, 0)),
    ("purple", RGB8::new(128, 0, 128)),
    ("pink", RGB8::new(255, 192, 203)),
    ("gray", RGB8::new(128, 128, 128)),
    ("grey", RGB8::new(128, 128, 128)),
    ("silver", RGB8::new(192, 192, 192)),
    ("maroon", RGB8::new(128, 0, 0)),
    ("navy", RGB8::new(0, 0, 128)),
    ("olive", RGB8::new(128, 128, 0)),
    ("teal", RGB8::new(0, 128, 128)),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{input}' is not a colour (expected #rgb, #rrggbb, rgb(r, g, b) or a colour name)")]
pub struct ColorParseError {
    input: String,
}

/// Parses the colour notations accepted on the control plane and in the settings file.
pub fn parse(input: &str) -> Result<RGB8, ColorParseError> {
    let trimmed = input.trim();
    let error = || ColorParseError {
        input: input.to_string(),
    };

    if let Some(hex) = trimmed.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(error);
    }

    let lowercase = trimmed.to_ascii_lowercase();
    if let Some(channels) = lowercase
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_functional(channels).ok_or_else(error);
    }

    NAMED
        .iter()
        .find(|(name, _)| *name == lowercase)
        .map(|(_, color)| *color)
        .ok_or_else(error)
}

fn parse_hex(hex: &str) -> Option<RGB8> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    match hex.len() {
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|n| n * 17);
            Some(RGB8::new(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 => {
            let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
            Some(RGB8::new(byte(0)?, byte(2)?, byte(4)?))
        }
        _ => None,
    }
}

fn parse_functional(channels: &str) -> Option<RGB8> {
    let mut parts = channels.split(',').map(|part| part.trim().parse::<u8>());
    let r = parts.next()?.ok()?;
    let g = parts.next()?.ok()?;
    let b = parts.next()?.ok()?;

    if parts.next().is_some() {
        return None;
    }

    Some(RGB8::new(r, g, b))
}

pub fn to_hex(color: RGB8) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}
