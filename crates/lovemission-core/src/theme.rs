use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::{AssignedTo, Status};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }

    pub fn parse_str(s: &str) -> Option<Self> {
        match s {
            "light" => Some(ThemeMode::Light),
            "dark" => Some(ThemeMode::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        }
    }

    pub fn palette(&self) -> &'static Palette {
        match self {
            ThemeMode::Light => &LIGHT,
            ThemeMode::Dark => &DARK,
        }
    }
}

impl fmt::Display for ThemeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Layered {
    pub primary: &'static str,
    pub secondary: &'static str,
    pub tertiary: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Border {
    pub primary: &'static str,
    pub secondary: &'static str,
}

/// Color tokens for one theme mode. Mode-independent tokens (brand,
/// semantic, assignment) are repeated in both palettes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub background: Layered,
    pub text: Layered,
    pub border: Border,
    pub shadow: &'static str,
    pub brand: &'static str,
    pub brand_light: &'static str,
    pub brand_dark: &'static str,
    pub success: &'static str,
    pub warning: &'static str,
    pub error: &'static str,
    pub info: &'static str,
}

impl Palette {
    pub fn assignment(&self, assigned_to: AssignedTo) -> &'static str {
        match assigned_to {
            AssignedTo::Me => "#EC4899",
            AssignedTo::Partner => "#A78BFA",
            AssignedTo::Both => "#C084FC",
        }
    }

    pub fn status(&self, status: Status) -> &'static str {
        match status {
            Status::Pending => self.warning,
            Status::Completed => self.success,
            Status::Cancelled => self.error,
        }
    }
}

pub static LIGHT: Palette = Palette {
    background: Layered {
        primary: "#FFFFFF",
        secondary: "#FFF5F7",
        tertiary: "#FFE4E6",
    },
    text: Layered {
        primary: "#111827",
        secondary: "#6B7280",
        tertiary: "#9CA3AF",
    },
    border: Border {
        primary: "#E5E7EB",
        secondary: "#F3F4F6",
    },
    shadow: "rgba(0, 0, 0, 0.1)",
    brand: "#EC4899",
    brand_light: "#F472B6",
    brand_dark: "#DB2777",
    success: "#10B981",
    warning: "#F59E0B",
    error: "#EF4444",
    info: "#3B82F6",
};

pub static DARK: Palette = Palette {
    background: Layered {
        primary: "#111827",
        secondary: "#1F2937",
        tertiary: "#374151",
    },
    text: Layered {
        primary: "#F9FAFB",
        secondary: "#D1D5DB",
        tertiary: "#9CA3AF",
    },
    border: Border {
        primary: "#374151",
        secondary: "#4B5563",
    },
    shadow: "rgba(0, 0, 0, 0.3)",
    brand: "#EC4899",
    brand_light: "#F472B6",
    brand_dark: "#DB2777",
    success: "#10B981",
    warning: "#F59E0B",
    error: "#EF4444",
    info: "#3B82F6",
};
