//! Welcome banner: "PLENARIO" in figlet's standard font with a green-to-yellow gradient.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Flag green (#009c3b).
const FLAG_GREEN: (u8, u8, u8) = (0x00, 0x9c, 0x3b);
/// Flag yellow (#ffdf00).
const FLAG_YELLOW: (u8, u8, u8) = (0xff, 0xdf, 0x00);

/// Linear interpolation between two RGB colors. `t` in [0.0, 1.0].
fn lerp_rgb(a: (u8, u8, u8), b: (u8, u8, u8), t: f64) -> (u8, u8, u8) {
    let r = (f64::from(a.0) * (1.0 - t) + f64::from(b.0) * t).round() as u8;
    let g = (f64::from(a.1) * (1.0 - t) + f64::from(b.1) * t).round() as u8;
    let bl = (f64::from(a.2) * (1.0 - t) + f64::from(b.2) * t).round() as u8;
    (r, g, bl)
}

/// Prints the banner, then version. Falls back to a plain title if the font fails to load.
pub fn print_welcome() {
    let mut out = stdout();
    let art = FIGfont::standard()
        .ok()
        .and_then(|font| font.convert("PLENARIO").map(|f| f.to_string()))
        .unwrap_or_else(|| "PLENARIO\n".to_string());
    let lines: Vec<&str> = art.lines().collect();
    let total = lines.len().max(1);

    for (i, line) in lines.iter().enumerate() {
        let t = if total <= 1 {
            1.0
        } else {
            i as f64 / (total - 1) as f64
        };
        let (r, g, b) = lerp_rgb(FLAG_GREEN, FLAG_YELLOW, t);
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let version = env!("CARGO_PKG_VERSION");
    let _ = out.execute(SetForegroundColor(Color::Rgb {
        r: FLAG_YELLOW.0,
        g: FLAG_YELLOW.1,
        b: FLAG_YELLOW.2,
    }));
    let _ = out.execute(Print(format!("v{}\r\n", version)));
    let _ = out.execute(Print("Usuários e proposições da Câmara\r\n"));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(lerp_rgb(FLAG_GREEN, FLAG_YELLOW, 0.0), FLAG_GREEN);
        assert_eq!(lerp_rgb(FLAG_GREEN, FLAG_YELLOW, 1.0), FLAG_YELLOW);
    }
}
