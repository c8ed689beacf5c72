//! Style: colors and modifiers for the three semantic color classes.
//!
//! The interface only ever paints with three classes: normal message text,
//! highlighted headers, and the input line. Each class is a [`Style`], and
//! the three together form a [`Palette`].

use bitflags::bitflags;

/// True-color RGB representation.
#[derive(Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Rgb {
    /// Red channel (0-255)
    pub r: u8,
    /// Green channel (0-255)
    pub g: u8,
    /// Blue channel (0-255)
    pub b: u8,
}

impl Rgb {
    /// Create a new RGB color.
    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// White (255, 255, 255)
    pub const WHITE: Self = Self::new(255, 255, 255);
    /// Green, used for channel headers.
    pub const GREEN: Self = Self::new(80, 220, 100);
    /// Blue, used for the input line.
    pub const BLUE: Self = Self::new(90, 150, 255);
}

impl std::fmt::Debug for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

bitflags! {
    /// Text style modifiers.
    ///
    /// # Example
    /// ```
    /// use backchannel::Modifiers;
    /// let style = Modifiers::BOLD | Modifiers::BLINK;
    /// assert!(style.contains(Modifiers::BLINK));
    /// ```
    #[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
    pub struct Modifiers: u8 {
        /// Bold text
        const BOLD = 0b0000_0001;
        /// Dim/faint text
        const DIM = 0b0000_0010;
        /// Underlined text
        const UNDERLINE = 0b0000_0100;
        /// Blinking text, used for attention lines
        const BLINK = 0b0000_1000;
        /// Reversed colors (fg/bg swapped)
        const REVERSED = 0b0001_0000;
    }
}

impl Modifiers {
    /// SGR parameter codes for every set modifier, in a stable order.
    pub fn sgr_codes(self) -> impl Iterator<Item = u8> {
        [
            (Self::BOLD, 1),
            (Self::DIM, 2),
            (Self::UNDERLINE, 4),
            (Self::BLINK, 5),
            (Self::REVERSED, 7),
        ]
        .into_iter()
        .filter(move |(flag, _)| self.contains(*flag))
        .map(|(_, code)| code)
    }
}

/// Foreground color plus modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Style {
    /// Foreground color.
    pub fg: Rgb,
    /// Modifiers applied on top of the color.
    pub modifiers: Modifiers,
}

impl Style {
    /// Create a style with no modifiers.
    pub const fn new(fg: Rgb) -> Self {
        Self {
            fg,
            modifiers: Modifiers::empty(),
        }
    }

    /// Add modifiers to this style.
    #[must_use]
    pub const fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = self.modifiers.union(modifiers);
        self
    }
}

/// The three semantic color classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Message body text.
    pub normal: Style,
    /// Channel headers and `> ` markers.
    pub highlight: Style,
    /// The input line.
    pub input: Style,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            normal: Style::new(Rgb::WHITE),
            highlight: Style::new(Rgb::GREEN).with_modifiers(Modifiers::BOLD),
            input: Style::new(Rgb::BLUE).with_modifiers(Modifiers::BOLD),
        }
    }
}
