//! Palette consumption and rgba color handling.

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, digit1, multispace0},
    combinator::{all_consuming, map_res, opt, recognize},
    sequence::{delimited, pair, preceded},
    IResult,
};
use rand::rngs::ThreadRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use crate::error::{ChartError, ChartResult};

/// A palette entry: a color name and its `rgba(...)` value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedColor {
    pub name: String,
    pub value: String,
}

impl NamedColor {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

const DEFAULT_COLORS: &[(&str, &str)] = &[
    ("dodgerBlue", "rgba(30, 144, 255, 1)"),
    ("deepPink", "rgba(255, 20, 147, 1)"),
    ("chartreuse", "rgba(127, 255, 0, 1)"),
    ("cyan", "rgba(0, 255, 255, 1)"),
    ("magenta", "rgba(255, 0, 255, 1)"),
    ("blue", "rgba(0, 0, 255, 1)"),
    ("purple", "rgba(128, 0, 128, 1)"),
    ("indigo", "rgba(75, 0, 130, 1)"),
    ("violet", "rgba(238, 130, 238, 1)"),
    ("orange", "rgba(255, 159, 64, 1)"),
    ("gold", "rgba(255, 215, 0, 1)"),
    ("lime", "rgba(0, 255, 0, 1)"),
    ("springGreen", "rgba(0, 255, 127, 1)"),
    ("peachPuff", "rgba(255, 218, 185, 1)"),
    ("wheat", "rgba(245, 222, 179, 1)"),
    ("lightYellow", "rgba(255, 206, 86, 1)"),
    ("lightCyan", "rgba(75, 192, 192, 1)"),
    ("skyBlue", "rgba(135, 206, 235, 1)"),
    ("lightBlue", "rgba(173, 216, 230, 1)"),
    ("lightSalmon", "rgba(255, 160, 122, 1)"),
    ("salmon", "rgba(250, 128, 114, 1)"),
    ("coral", "rgba(255, 127, 80, 1)"),
    ("paleGreen", "rgba(152, 251, 152, 1)"),
    ("midnightBlue", "rgba(25, 25, 112, 1)"),
    ("saddleBrown", "rgba(139, 69, 19, 1)"),
    ("fireBrick", "rgba(178, 34, 34, 1)"),
    ("sienna", "rgba(160, 82, 45, 1)"),
    ("darkSlateGray", "rgba(47, 79, 79, 1)"),
    ("maroon", "rgba(128, 0, 0, 1)"),
    ("navy", "rgba(0, 0, 128, 1)"),
    ("forestGreen", "rgba(34, 139, 34, 1)"),
    ("lightCoral", "rgba(255, 99, 132, 1)"),
];

/// Ordered palette, consumed from either end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: VecDeque<NamedColor>,
}

impl Palette {
    pub fn new(colors: impl IntoIterator<Item = NamedColor>) -> Self {
        Self {
            colors: colors.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    fn take(&mut self, from_end: bool) -> Option<NamedColor> {
        if from_end {
            self.colors.pop_back()
        } else {
            self.colors.pop_front()
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(
            DEFAULT_COLORS
                .iter()
                .map(|(name, value)| NamedColor::new(*name, *value)),
        )
    }
}

/// Hands out palette colors for one render, falling back to random colors
/// once the palette runs dry.
pub struct ColorAllocator<R: Rng = ThreadRng> {
    palette: Palette,
    rng: R,
}

impl ColorAllocator<ThreadRng> {
    pub fn new(palette: Palette) -> Self {
        Self::with_rng(palette, rand::thread_rng())
    }
}

impl<R: Rng> ColorAllocator<R> {
    pub fn with_rng(palette: Palette, rng: R) -> Self {
        Self { palette, rng }
    }

    /// Remove and return the front (or back) palette color.
    ///
    /// An empty palette yields a random opaque color and stays empty.
    pub fn pick_color(&mut self, from_end: bool) -> String {
        match self.palette.take(from_end) {
            Some(color) => color.value,
            None => self.random_color(),
        }
    }

    fn random_color(&mut self) -> String {
        Rgba {
            r: self.rng.gen(),
            g: self.rng.gen(),
            b: self.rng.gen(),
            a: 1.0,
        }
        .to_string()
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
}

/// An `rgba(r, g, b, a)` color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64,
}

impl Rgba {
    /// Parse `rgb(r, g, b)` or `rgba(r, g, b, a)`.
    pub fn parse(input: &str) -> ChartResult<Self> {
        all_consuming(delimited(multispace0, rgba, multispace0))(input)
            .map(|(_, color)| color)
            .map_err(|_| ChartError::InvalidColorFormat(input.to_string()))
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

/// Return `color` with its alpha replaced by `alpha`, clamped to [0, 1].
pub fn with_alpha(color: &str, alpha: f64) -> ChartResult<String> {
    let rgba = Rgba::parse(color)?;
    Ok(Rgba {
        a: alpha.clamp(0.0, 1.0),
        ..rgba
    }
    .to_string())
}

fn channel(input: &str) -> IResult<&str, u8> {
    map_res(digit1, |s: &str| s.parse::<u8>())(input)
}

fn alpha_value(input: &str) -> IResult<&str, f64> {
    map_res(
        recognize(pair(opt(digit1), opt(pair(char('.'), digit1)))),
        |s: &str| s.parse::<f64>(),
    )(input)
}

fn comma(input: &str) -> IResult<&str, char> {
    delimited(multispace0, char(','), multispace0)(input)
}

fn rgba(input: &str) -> IResult<&str, Rgba> {
    let (input, _) = alt((tag("rgba("), tag("rgb(")))(input)?;
    let (input, r) = preceded(multispace0, channel)(input)?;
    let (input, _) = comma(input)?;
    let (input, g) = channel(input)?;
    let (input, _) = comma(input)?;
    let (input, b) = channel(input)?;
    let (input, a) = opt(preceded(comma, alpha_value))(input)?;
    let (input, _) = preceded(multispace0, char(')'))(input)?;
    Ok((
        input,
        Rgba {
            r,
            g,
            b,
            a: a.unwrap_or(1.0),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn seeded(palette: Palette) -> ColorAllocator<StdRng> {
        ColorAllocator::with_rng(palette, StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_pick_from_front_and_back() {
        let mut colors = seeded(Palette::default());
        assert_eq!(colors.pick_color(false), "rgba(30, 144, 255, 1)");
        assert_eq!(colors.pick_color(true), "rgba(255, 99, 132, 1)");
        assert_eq!(colors.palette().len(), DEFAULT_COLORS.len() - 2);
    }

    #[test]
    fn test_pick_removes_exactly_one() {
        let mut colors = seeded(Palette::new(vec![
            NamedColor::new("a", "rgba(1, 2, 3, 1)"),
            NamedColor::new("b", "rgba(4, 5, 6, 1)"),
        ]));
        colors.pick_color(false);
        assert_eq!(colors.palette().len(), 1);
    }

    #[test]
    fn test_empty_palette_yields_random_opaque_color() {
        let mut colors = seeded(Palette::empty());
        for _ in 0..20 {
            let color = colors.pick_color(false);
            let parsed = Rgba::parse(&color).unwrap();
            assert_eq!(parsed.a, 1.0);
            assert!(color.starts_with("rgba("));
            assert!(color.ends_with(", 1)"));
        }
        assert!(colors.palette().is_empty());
    }

    #[test]
    fn test_with_alpha() {
        assert_eq!(
            with_alpha("rgba(30, 144, 255, 1)", 0.7).unwrap(),
            "rgba(30, 144, 255, 0.7)"
        );
        assert_eq!(with_alpha("rgb(1,2,3)", 0.5).unwrap(), "rgba(1, 2, 3, 0.5)");
    }

    #[test]
    fn test_with_alpha_clamps() {
        assert_eq!(with_alpha("rgba(1, 2, 3, 1)", 3.0).unwrap(), "rgba(1, 2, 3, 1)");
        assert_eq!(with_alpha("rgba(1, 2, 3, 1)", -1.0).unwrap(), "rgba(1, 2, 3, 0)");
    }

    #[test]
    fn test_with_alpha_rejects_bad_format() {
        let err = with_alpha("dodgerblue", 0.5).unwrap_err();
        assert_eq!(err, ChartError::InvalidColorFormat("dodgerblue".to_string()));
        assert!(with_alpha("rgba(300, 0, 0, 1)", 0.5).is_err());
    }
}
