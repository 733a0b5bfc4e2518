//! Mode flags of the correction passes.
//!
//! Every flag carries the integer code used by the clip settings of the host application.
//! Unknown codes are rejected when converting from `i32`; once a value is typed, the
//! state's setters store it as given.

use crate::image_pipeline::common::error::{RawProcError, Result};

macro_rules! mode_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $($(#[$vmeta:meta])* $variant:ident = $code:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            pub fn code(self) -> i32 {
                match self {
                    $(Self::$variant => $code),+
                }
            }
        }

        impl TryFrom<i32> for $name {
            type Error = RawProcError;

            fn try_from(value: i32) -> Result<Self> {
                match value {
                    $($code => Ok(Self::$variant),)+
                    _ => Err(RawProcError::InvalidMode { name: $label, value }),
                }
            }
        }
    };
}

mode_enum! {
    /// Vertical stripe (column banding) correction.
    VerticalStripeMode, "vertical stripe mode" {
        Off = 0,
        /// Apply only when the computed coefficients say the frame needs it
        Normal = 1,
        /// Always apply the coefficients
        Force = 2,
    }
}

mode_enum! {
    FocusPixelMode, "focus pixel mode" {
        Off = 0,
        On = 1,
        /// Force the crop-record pixel layout
        CropRec = 2,
    }
}

mode_enum! {
    /// Interpolation used to replace focus and bad pixels.
    PixelInterpolation, "pixel interpolation method" {
        /// Mean of the nearest same-colour neighbours
        Mlvfs = 0,
        /// Median of the same-colour 5x5 neighbourhood
        Raw2Dng = 1,
    }
}

mode_enum! {
    BadPixelMode, "bad pixel mode" {
        Off = 0,
        On = 1,
        Aggressive = 2,
    }
}

mode_enum! {
    BadPixelSearch, "bad pixel search method" {
        /// Search once per clip and reuse the map
        Normal = 0,
        /// Search again on every frame
        Force = 1,
    }
}

mode_enum! {
    /// Chroma smoothing window.
    ChromaSmooth, "chroma smooth radius" {
        Off = 0,
        TwoByTwo = 2,
        ThreeByThree = 3,
        FiveByFive = 5,
    }
}

mode_enum! {
    DualIsoMode, "dual ISO mode" {
        Off = 0,
        /// Full resolution merge into a 20-bit range
        Full20Bit = 1,
        /// Cheap row-gain matching
        Preview = 2,
    }
}

mode_enum! {
    /// Interpolation used by the full dual ISO merge.
    DualIsoInterpolation, "dual ISO interpolation method" {
        Amaze = 0,
        Mean23 = 1,
    }
}

mode_enum! {
    DarkFrameMode, "dark frame mode" {
        Off = 0,
        /// Dark frame loaded from a separate file
        External = 1,
        /// Dark frame embedded in the clip
        Internal = 2,
    }
}

impl ChromaSmooth {
    /// Window edge length in same-colour pixels, zero when off.
    pub fn radius(self) -> usize {
        self.code() as usize
    }
}
