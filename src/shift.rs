/*
 *  shift.rs
 *
 *  shiftwall - keep the watch
 *  (c) 2024-26 shiftwall authors
 *
 *  Shift resolution from wall-clock time, plus the static per-shift
 *  color and banner tables
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use embedded_graphics::pixelcolor::Rgb888;
use std::fmt;
use std::time::Duration;

/// The timezone the shift schedule is defined in.  The schedule runs on
/// Moonbase time; anyone asking for their own timezone instead gets it,
/// but earns a shame ticket.
pub const REFERENCE_ZONE: Tz = chrono_tz::America::Los_Angeles;

/// The discrete time-of-day (or override) category currently displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    /// Sentinel: no prior render exists for the current surface.  Never a
    /// legitimate resolved shift.
    Unset,
    /// Dawn Guard (6a-12n)
    DawnGuard,
    /// Alpha Flight (12n-6p)
    AlphaFlight,
    /// Night Watch (6p-12m)
    NightWatch,
    /// Zeta Shift (12m-6a)
    ZetaShift,
    /// Omega Shift (whenever the checker says it is)
    OmegaShift,
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Shift::Unset => "Unset",
            Shift::DawnGuard => "DawnGuard",
            Shift::AlphaFlight => "AlphaFlight",
            Shift::NightWatch => "NightWatch",
            Shift::ZetaShift => "ZetaShift",
            Shift::OmegaShift => "OmegaShift",
        };
        write!(f, "{name}")
    }
}

/// Which wall clock the shift schedule is read against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimezonePolicy {
    /// The fixed reference zone ([`REFERENCE_ZONE`]).  Default.
    Reference,
    /// The host's local timezone.
    SystemLocal,
}

impl TimezonePolicy {
    pub fn from_reference_pref(use_reference: bool) -> Self {
        if use_reference {
            TimezonePolicy::Reference
        } else {
            TimezonePolicy::SystemLocal
        }
    }

    fn local_hour(self, now: DateTime<Utc>) -> u32 {
        match self {
            TimezonePolicy::Reference => now.with_timezone(&REFERENCE_ZONE).hour(),
            TimezonePolicy::SystemLocal => now.with_timezone(&Local).hour(),
        }
    }

    fn seconds_into_hour(self, now: DateTime<Utc>) -> u32 {
        match self {
            TimezonePolicy::Reference => {
                let t = now.with_timezone(&REFERENCE_ZONE);
                t.minute() * 60 + t.second()
            }
            TimezonePolicy::SystemLocal => {
                let t = now.with_timezone(&Local);
                t.minute() * 60 + t.second()
            }
        }
    }
}

/// Resolves the shift for an instant.  Pure: same hour under the same
/// policy always yields the same shift.  An active override wins over the
/// clock unconditionally.
pub fn resolve_shift(now: DateTime<Utc>, policy: TimezonePolicy, override_active: bool) -> Shift {
    if override_active {
        return Shift::OmegaShift;
    }
    match policy.local_hour(now) {
        0..=5 => Shift::ZetaShift,
        6..=11 => Shift::DawnGuard,
        12..=17 => Shift::AlphaFlight,
        _ => Shift::NightWatch,
    }
}

/// Time remaining until the top of the next hour under the given policy.
/// Returns a full hour when called exactly on the hour.
pub fn until_next_hour(now: DateTime<Utc>, policy: TimezonePolicy) -> Duration {
    let into_hour = policy.seconds_into_hour(now) as u64 * 1000
        + (now.timestamp_subsec_millis() as u64).min(999);
    Duration::from_millis(3_600_000 - into_hour.min(3_599_999))
}

/// The three representative colors reported to any ambient-palette
/// listener when a settle completes.  Primary is the background fill;
/// secondary and tertiary are fixed accents per shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftPalette {
    pub primary: Rgb888,
    pub secondary: Rgb888,
    pub tertiary: Rgb888,
}

/// Banner art described as a stack of horizontal color bands at a fixed
/// intrinsic aspect ratio.  The renderer scales the whole banner to the
/// frame height and centers it.
#[derive(Debug, Clone, Copy)]
pub struct BannerArt {
    pub intrinsic_width: u32,
    pub intrinsic_height: u32,
    /// (color, relative weight), top to bottom.
    pub bands: &'static [(Rgb888, u32)],
}

impl BannerArt {
    pub fn aspect(&self) -> f32 {
        self.intrinsic_width as f32 / self.intrinsic_height as f32
    }
}

// Background fills.
const BG_DAWNGUARD: Rgb888 = Rgb888::new(0xef, 0x81, 0x31);
const BG_ALPHAFLIGHT: Rgb888 = Rgb888::new(0xb9, 0x3f, 0x32);
const BG_BETAFLIGHT: Rgb888 = Rgb888::new(0x4c, 0x7b, 0x36);
const BG_NIGHTWATCH: Rgb888 = Rgb888::new(0x1a, 0x2e, 0x4c);
const BG_DUSKGUARD: Rgb888 = Rgb888::new(0x5a, 0x3a, 0x6e);
const BG_ZETASHIFT: Rgb888 = Rgb888::new(0x3b, 0x1f, 0x50);
const BG_OMEGASHIFT: Rgb888 = Rgb888::new(0x2b, 0x2b, 0x2b);

// Accent pairs (secondary, tertiary).
const AC_DAWNGUARD: (Rgb888, Rgb888) =
    (Rgb888::new(0xf7, 0xc8, 0x5e), Rgb888::new(0xff, 0xd4, 0x00));
const AC_ALPHAFLIGHT: (Rgb888, Rgb888) =
    (Rgb888::new(0xe5, 0xa3, 0x99), Rgb888::new(0xff, 0xff, 0xff));
const AC_BETAFLIGHT: (Rgb888, Rgb888) =
    (Rgb888::new(0x89, 0xb2, 0x70), Rgb888::new(0xc6, 0xdd, 0xb4));
const AC_NIGHTWATCH: (Rgb888, Rgb888) =
    (Rgb888::new(0x3c, 0x6e, 0xa5), Rgb888::new(0x9f, 0xc3, 0xe8));
const AC_DUSKGUARD: (Rgb888, Rgb888) =
    (Rgb888::new(0x8e, 0x5f, 0xa8), Rgb888::new(0xc9, 0xa6, 0xde));
const AC_ZETASHIFT: (Rgb888, Rgb888) =
    (Rgb888::new(0x7e, 0x4f, 0xa0), Rgb888::new(0xff, 0xff, 0xff));
// Omega carries all four shift colors; the moon blue of Night Watch makes
// the least-bad secondary.
const AC_OMEGASHIFT: (Rgb888, Rgb888) =
    (Rgb888::new(0x3c, 0x6e, 0xa5), Rgb888::new(0xff, 0xff, 0xff));

const ART_DAWNGUARD: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_DAWNGUARD, 4),
        (AC_DAWNGUARD.1, 1),
        (AC_DAWNGUARD.0, 4),
    ],
};

const ART_ALPHAFLIGHT: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_ALPHAFLIGHT, 3),
        (AC_ALPHAFLIGHT.1, 1),
        (AC_ALPHAFLIGHT.0, 2),
        (BG_ALPHAFLIGHT, 3),
    ],
};

const ART_BETAFLIGHT: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_BETAFLIGHT, 3),
        (AC_BETAFLIGHT.1, 1),
        (AC_BETAFLIGHT.0, 2),
        (BG_BETAFLIGHT, 3),
    ],
};

const ART_NIGHTWATCH: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_NIGHTWATCH, 2),
        (AC_NIGHTWATCH.0, 3),
        (AC_NIGHTWATCH.1, 1),
        (BG_NIGHTWATCH, 3),
    ],
};

const ART_DUSKGUARD: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_DUSKGUARD, 2),
        (AC_DUSKGUARD.0, 3),
        (AC_DUSKGUARD.1, 1),
        (BG_DUSKGUARD, 3),
    ],
};

const ART_ZETASHIFT: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_ZETASHIFT, 3),
        (AC_ZETASHIFT.0, 2),
        (AC_ZETASHIFT.1, 1),
        (BG_ZETASHIFT, 4),
    ],
};

const ART_OMEGASHIFT: BannerArt = BannerArt {
    intrinsic_width: 450,
    intrinsic_height: 800,
    bands: &[
        (BG_OMEGASHIFT, 2),
        (BG_DAWNGUARD, 1),
        (BG_ALPHAFLIGHT, 1),
        (BG_NIGHTWATCH, 1),
        (BG_ZETASHIFT, 1),
        (AC_OMEGASHIFT.1, 1),
        (BG_OMEGASHIFT, 3),
    ],
};

/// Background color for a shift.  `None` for the unset sentinel, which has
/// nothing to draw.  `bee_shed` selects the alternate banner set for the
/// two shifts that have one.
pub fn background_color(shift: Shift, bee_shed: bool) -> Option<Rgb888> {
    match shift {
        Shift::Unset => None,
        Shift::DawnGuard => Some(BG_DAWNGUARD),
        Shift::AlphaFlight => Some(if bee_shed { BG_BETAFLIGHT } else { BG_ALPHAFLIGHT }),
        Shift::NightWatch => Some(if bee_shed { BG_DUSKGUARD } else { BG_NIGHTWATCH }),
        Shift::ZetaShift => Some(BG_ZETASHIFT),
        Shift::OmegaShift => Some(BG_OMEGASHIFT),
    }
}

/// Banner art for a shift, or `None` for the unset sentinel.
pub fn banner_art(shift: Shift, bee_shed: bool) -> Option<&'static BannerArt> {
    match shift {
        Shift::Unset => None,
        Shift::DawnGuard => Some(&ART_DAWNGUARD),
        Shift::AlphaFlight => Some(if bee_shed { &ART_BETAFLIGHT } else { &ART_ALPHAFLIGHT }),
        Shift::NightWatch => Some(if bee_shed { &ART_DUSKGUARD } else { &ART_NIGHTWATCH }),
        Shift::ZetaShift => Some(&ART_ZETASHIFT),
        Shift::OmegaShift => Some(&ART_OMEGASHIFT),
    }
}

/// Full palette for a shift, or `None` for the unset sentinel.
pub fn palette_for(shift: Shift, bee_shed: bool) -> Option<ShiftPalette> {
    let primary = background_color(shift, bee_shed)?;
    let (secondary, tertiary) = match shift {
        Shift::Unset => return None,
        Shift::DawnGuard => AC_DAWNGUARD,
        Shift::AlphaFlight => {
            if bee_shed {
                AC_BETAFLIGHT
            } else {
                AC_ALPHAFLIGHT
            }
        }
        Shift::NightWatch => {
            if bee_shed {
                AC_DUSKGUARD
            } else {
                AC_NIGHTWATCH
            }
        }
        Shift::ZetaShift => AC_ZETASHIFT,
        Shift::OmegaShift => AC_OMEGASHIFT,
    };
    Some(ShiftPalette { primary, secondary, tertiary })
}

/// Convenience for tests and callers that want an instant at a given
/// reference-zone wall time.
pub fn reference_time(
    y: i32,
    mo: u32,
    d: u32,
    h: u32,
    mi: u32,
    s: u32,
) -> DateTime<Utc> {
    REFERENCE_ZONE
        .with_ymd_and_hms(y, mo, d, h, mi, s)
        .single()
        .expect("unambiguous reference-zone time")
        .with_timezone(&Utc)
}
