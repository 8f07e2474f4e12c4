use serde::{Deserialize, Serialize};

use super::errors::CatalogError;

// ============================================================================
// Print Attributes
// ============================================================================
//
// The four attributes that key a price combination. Each has a canonical
// wire/database spelling plus a few tolerated aliases seen in older
// client payloads. Parsing from text is case-insensitive.
//
// ============================================================================

macro_rules! print_attribute {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $text:literal $(| $alias:literal)*),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text $(, alias = $alias)*)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = CatalogError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) $(|| s.eq_ignore_ascii_case($alias))* {
                        return Ok($name::$variant);
                    }
                )+
                Err(CatalogError::UnknownAttribute {
                    kind: stringify!($name),
                    value: s.to_string(),
                })
            }
        }
    };
}

print_attribute! {
    /// Ink mode
    ColorMode {
        BlackWhite => "BW" | "BLACK_WHITE" | "B&W",
        Color => "COLOR" | "COLOUR",
    }
}

print_attribute! {
    PaperSize {
        A4 => "A4",
        A3 => "A3",
        Letter => "LETTER",
        Legal => "LEGAL",
    }
}

print_attribute! {
    /// Paper weight in grams per square metre
    PaperQuality {
        Gsm70 => "70GSM" | "70",
        Gsm80 => "80GSM" | "80",
        Gsm100 => "100GSM" | "100",
        Gsm120 => "120GSM" | "120",
    }
}

print_attribute! {
    /// Single- or double-sided printing
    PrintSide {
        Single => "SINGLE" | "SINGLE_SIDED" | "ONE_SIDED",
        Double => "DOUBLE" | "DOUBLE_SIDED" | "TWO_SIDED",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive_and_accepts_aliases() {
        assert_eq!("color".parse::<ColorMode>().unwrap(), ColorMode::Color);
        assert_eq!(" B&W ".parse::<ColorMode>().unwrap(), ColorMode::BlackWhite);
        assert_eq!("80".parse::<PaperQuality>().unwrap(), PaperQuality::Gsm80);
        assert_eq!("double_sided".parse::<PrintSide>().unwrap(), PrintSide::Double);
    }

    #[test]
    fn test_unknown_value_names_the_attribute() {
        let err = "B5".parse::<PaperSize>().unwrap_err();
        assert_eq!(
            err,
            CatalogError::UnknownAttribute {
                kind: "PaperSize",
                value: "B5".to_string()
            }
        );
    }

    #[test]
    fn test_serde_uses_canonical_spelling() {
        assert_eq!(serde_json::to_string(&PaperQuality::Gsm100).unwrap(), "\"100GSM\"");
        let parsed: ColorMode = serde_json::from_str("\"BLACK_WHITE\"").unwrap();
        assert_eq!(parsed, ColorMode::BlackWhite);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for size in PaperSize::ALL {
            assert_eq!(size.to_string().parse::<PaperSize>().unwrap(), *size);
        }
    }
}
