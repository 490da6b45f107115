use anyhow::{anyhow, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// RGB colour with components in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color(pub Vec3);

impl Color {
    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xff) as f32 / 255.0;
        let g = ((hex >> 8) & 0xff) as f32 / 255.0;
        let b = (hex & 0xff) as f32 / 255.0;
        Self(Vec3::new(r, g, b))
    }

    pub fn rgb(self) -> Vec3 {
        self.0
    }

    /// Parses a CSS colour keyword, `#rrggbb`, `0xrrggbb` or an `r g b`
    /// triple of bytes.
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if let Some(hex) = value
            .strip_prefix('#')
            .or_else(|| value.strip_prefix("0x"))
            .or_else(|| value.strip_prefix("0X"))
        {
            let hex = u32::from_str_radix(hex, 16)
                .map_err(|err| anyhow!("invalid hex colour `{value}`: {err}"))?;
            if hex > 0xffffff {
                return Err(anyhow!("hex colour `{value}` is out of range"));
            }
            return Ok(Self::from_hex(hex));
        }
        if let Some(color) = named_color(value) {
            return Ok(color);
        }

        let mut numbers = value
            .split_whitespace()
            .map(|component| component.parse::<f32>());
        let mut next = || -> Result<f32> {
            numbers
                .next()
                .ok_or_else(|| anyhow!("colour `{value}` is missing components"))?
                .map_err(|err| anyhow!("invalid colour component in `{value}`: {err}"))
        };
        let (r, g, b) = (next()?, next()?, next()?);
        if numbers.next().is_some() {
            return Err(anyhow!("colour `{value}` has more than three components"));
        }
        Ok(Self(Vec3::new(r / 255.0, g / 255.0, b / 255.0)))
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::from_hex(0xffffff)
    }
}

fn named_color(name: &str) -> Option<Color> {
    let hex = match name.to_ascii_lowercase().as_str() {
        "black" => 0x000000,
        "white" => 0xffffff,
        "gray" | "grey" => 0x808080,
        "red" => 0xff0000,
        "green" => 0x008000,
        "lime" => 0x00ff00,
        "blue" => 0x0000ff,
        "yellow" => 0xffff00,
        "orange" => 0xffa500,
        "purple" => 0x800080,
        "brown" => 0xa52a2a,
        "saddlebrown" => 0x8b4513,
        _ => return None,
    };
    Some(Color::from_hex(hex))
}
