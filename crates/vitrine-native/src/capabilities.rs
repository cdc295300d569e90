//! Desired and chosen surface attributes.

use crate::error::NativeError;

/// Minimum combined red + green + blue depth of a usable visual.
pub const MIN_COLOR_DEPTH: u32 = 15;

/// Per-channel bit depths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorBits {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub alpha: u8,
}

impl ColorBits {
    pub const fn new(red: u8, green: u8, blue: u8, alpha: u8) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Combined red, green and blue depth.
    pub const fn rgb_depth(&self) -> u32 {
        self.red as u32 + self.green as u32 + self.blue as u32
    }
}

/// Describes the attributes of a rendering surface.
///
/// The same type is used for the attributes an application asks for and
/// for the attributes a platform actually chose. Once chosen it is never
/// modified; the `with_*` methods return a new value.
///
/// # Example
///
/// ```
/// use vitrine_native::CapabilityDescriptor;
///
/// let caps = CapabilityDescriptor::new()
///     .with_double_buffered(false)
///     .with_samples(8)
///     .with_onscreen(false);
///
/// assert!(caps.sample_buffers);
/// assert!(caps.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CapabilityDescriptor {
    pub color: ColorBits,
    pub depth_bits: u8,
    pub stencil_bits: u8,
    pub accum: ColorBits,
    pub double_buffered: bool,
    pub stereo: bool,
    pub sample_buffers: bool,
    pub num_samples: u8,
    pub hardware_accelerated: bool,
    pub onscreen: bool,
}

impl Default for CapabilityDescriptor {
    fn default() -> Self {
        Self {
            color: ColorBits::new(8, 8, 8, 0),
            depth_bits: 16,
            stencil_bits: 0,
            accum: ColorBits::default(),
            double_buffered: true,
            stereo: false,
            sample_buffers: false,
            num_samples: 2,
            hardware_accelerated: true,
            onscreen: true,
        }
    }
}

impl CapabilityDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_color(mut self, color: ColorBits) -> Self {
        self.color = color;
        self
    }

    pub fn with_depth_bits(mut self, bits: u8) -> Self {
        self.depth_bits = bits;
        self
    }

    pub fn with_stencil_bits(mut self, bits: u8) -> Self {
        self.stencil_bits = bits;
        self
    }

    pub fn with_accum(mut self, accum: ColorBits) -> Self {
        self.accum = accum;
        self
    }

    pub fn with_double_buffered(mut self, enabled: bool) -> Self {
        self.double_buffered = enabled;
        self
    }

    pub fn with_stereo(mut self, enabled: bool) -> Self {
        self.stereo = enabled;
        self
    }

    /// Enables sample buffers with `samples` samples, or disables them for `0`.
    pub fn with_samples(mut self, samples: u8) -> Self {
        self.sample_buffers = samples > 0;
        if samples > 0 {
            self.num_samples = samples;
        }
        self
    }

    pub fn with_hardware_accelerated(mut self, enabled: bool) -> Self {
        self.hardware_accelerated = enabled;
        self
    }

    pub fn with_onscreen(mut self, onscreen: bool) -> Self {
        self.onscreen = onscreen;
        self
    }

    /// Rejects descriptors whose color depth is below [`MIN_COLOR_DEPTH`].
    pub fn validate(&self) -> Result<(), NativeError> {
        let bits = self.color.rgb_depth();
        if bits < MIN_COLOR_DEPTH {
            return Err(NativeError::InsufficientColorDepth {
                bits,
                min: MIN_COLOR_DEPTH,
            });
        }
        Ok(())
    }

    /// Translates the descriptor into a native attribute list.
    ///
    /// Multisample attributes are only emitted when the platform reported
    /// multisample support.
    pub fn to_attrib_list(&self, multisample_available: bool) -> Result<AttribList, NativeError> {
        self.validate()?;

        let mut attribs = Vec::with_capacity(16);
        attribs.push(SurfaceAttrib::Rgba);
        if self.double_buffered {
            attribs.push(SurfaceAttrib::DoubleBuffer);
        }
        if self.stereo {
            attribs.push(SurfaceAttrib::Stereo);
        }
        attribs.push(SurfaceAttrib::RedSize(self.color.red));
        attribs.push(SurfaceAttrib::GreenSize(self.color.green));
        attribs.push(SurfaceAttrib::BlueSize(self.color.blue));
        attribs.push(SurfaceAttrib::AlphaSize(self.color.alpha));
        attribs.push(SurfaceAttrib::DepthSize(self.depth_bits));
        attribs.push(SurfaceAttrib::StencilSize(self.stencil_bits));
        attribs.push(SurfaceAttrib::AccumRedSize(self.accum.red));
        attribs.push(SurfaceAttrib::AccumGreenSize(self.accum.green));
        attribs.push(SurfaceAttrib::AccumBlueSize(self.accum.blue));
        if multisample_available && self.sample_buffers {
            attribs.push(SurfaceAttrib::SampleBuffers);
            attribs.push(SurfaceAttrib::Samples(self.num_samples));
        }

        Ok(AttribList { attribs })
    }
}

/// A single attribute of a native visual request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceAttrib {
    Rgba,
    DoubleBuffer,
    Stereo,
    RedSize(u8),
    GreenSize(u8),
    BlueSize(u8),
    AlphaSize(u8),
    DepthSize(u8),
    StencilSize(u8),
    AccumRedSize(u8),
    AccumGreenSize(u8),
    AccumBlueSize(u8),
    SampleBuffers,
    Samples(u8),
}

/// An ordered list of visual attributes, produced from a validated
/// [`CapabilityDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttribList {
    attribs: Vec<SurfaceAttrib>,
}

impl AttribList {
    pub fn as_slice(&self) -> &[SurfaceAttrib] {
        &self.attribs
    }

    pub fn contains(&self, attrib: SurfaceAttrib) -> bool {
        self.attribs.contains(&attrib)
    }

    pub fn len(&self) -> usize {
        self.attribs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attribs.is_empty()
    }
}

impl<'a> IntoIterator for &'a AttribList {
    type Item = &'a SurfaceAttrib;
    type IntoIter = std::slice::Iter<'a, SurfaceAttrib>;

    fn into_iter(self) -> Self::IntoIter {
        self.attribs.iter()
    }
}
