// ── Engineering units ──
//
// Subset of the standard unit enumeration the mirror renders. Unknown
// codes degrade to their numeric form instead of failing a fetch.

/// A resolved engineering unit with a display symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum EngineeringUnit {
    Amperes,
    Volts,
    KilowattHours,
    Hertz,
    PercentRelativeHumidity,
    Lumens,
    Luxes,
    Watts,
    Kilowatts,
    Pascals,
    Kilopascals,
    DegreesCelsius,
    DegreesKelvin,
    DegreesFahrenheit,
    Minutes,
    Seconds,
    Hours,
    MetersPerSecond,
    CubicFeetPerMinute,
    LitersPerSecond,
    NoUnits,
    PartsPerMillion,
    Percent,
}

impl EngineeringUnit {
    /// Standard enumeration code.
    pub fn code(self) -> u32 {
        match self {
            Self::Amperes => 3,
            Self::Volts => 5,
            Self::KilowattHours => 19,
            Self::Hertz => 27,
            Self::PercentRelativeHumidity => 29,
            Self::Lumens => 36,
            Self::Luxes => 37,
            Self::Watts => 47,
            Self::Kilowatts => 48,
            Self::Pascals => 53,
            Self::Kilopascals => 54,
            Self::DegreesCelsius => 62,
            Self::DegreesKelvin => 63,
            Self::DegreesFahrenheit => 64,
            Self::Minutes => 72,
            Self::Seconds => 73,
            Self::Hours => 71,
            Self::MetersPerSecond => 74,
            Self::CubicFeetPerMinute => 84,
            Self::LitersPerSecond => 87,
            Self::NoUnits => 95,
            Self::PartsPerMillion => 96,
            Self::Percent => 98,
        }
    }

    /// Resolve an enumeration code. `None` for codes outside the subset.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            3 => Some(Self::Amperes),
            5 => Some(Self::Volts),
            19 => Some(Self::KilowattHours),
            27 => Some(Self::Hertz),
            29 => Some(Self::PercentRelativeHumidity),
            36 => Some(Self::Lumens),
            37 => Some(Self::Luxes),
            47 => Some(Self::Watts),
            48 => Some(Self::Kilowatts),
            53 => Some(Self::Pascals),
            54 => Some(Self::Kilopascals),
            62 => Some(Self::DegreesCelsius),
            63 => Some(Self::DegreesKelvin),
            64 => Some(Self::DegreesFahrenheit),
            71 => Some(Self::Hours),
            72 => Some(Self::Minutes),
            73 => Some(Self::Seconds),
            74 => Some(Self::MetersPerSecond),
            84 => Some(Self::CubicFeetPerMinute),
            87 => Some(Self::LitersPerSecond),
            95 => Some(Self::NoUnits),
            96 => Some(Self::PartsPerMillion),
            98 => Some(Self::Percent),
            _ => None,
        }
    }

    /// Short display symbol shown next to a present value.
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Amperes => "A",
            Self::Volts => "V",
            Self::KilowattHours => "kWh",
            Self::Hertz => "Hz",
            Self::PercentRelativeHumidity => "%RH",
            Self::Lumens => "lm",
            Self::Luxes => "lx",
            Self::Watts => "W",
            Self::Kilowatts => "kW",
            Self::Pascals => "Pa",
            Self::Kilopascals => "kPa",
            Self::DegreesCelsius => "°C",
            Self::DegreesKelvin => "K",
            Self::DegreesFahrenheit => "°F",
            Self::Minutes => "min",
            Self::Seconds => "s",
            Self::Hours => "h",
            Self::MetersPerSecond => "m/s",
            Self::CubicFeetPerMinute => "cfm",
            Self::LitersPerSecond => "L/s",
            Self::NoUnits => "",
            Self::PartsPerMillion => "ppm",
            Self::Percent => "%",
        }
    }

    /// Display label for an arbitrary code: the symbol when the code is
    /// in the subset, the bare number otherwise.
    pub fn label_for(code: u32) -> String {
        Self::from_code(code).map_or_else(|| code.to_string(), |u| u.symbol().to_owned())
    }
}
