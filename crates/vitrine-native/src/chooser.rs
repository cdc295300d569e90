//! Visual selection.
//!
//! A [`SurfaceProvider`] enumerates the visuals of a device into a
//! [`VisualList`]; a [`CapabilitiesChooser`] picks one of them.

use std::fmt;

use vitrine_core::profiling::profile_function;

use crate::{
    capabilities::CapabilityDescriptor,
    device::{self, GraphicsDevice},
    error::NativeError,
    surface::SurfaceProvider,
};

/// Native visual storage released when the list is dropped.
type Release = Box<dyn FnOnce() + Send>;

/// The visuals enumerated on a device.
///
/// Entries that cannot be rendered to are `None`. The native storage behind
/// the enumeration is released exactly once, when the list is dropped, so
/// every exit path of a selection frees it.
pub struct VisualList {
    visuals: Vec<Option<CapabilityDescriptor>>,
    recommended: Option<usize>,
    release: Option<Release>,
}

impl VisualList {
    pub fn new(visuals: Vec<Option<CapabilityDescriptor>>, recommended: Option<usize>) -> Self {
        Self {
            visuals,
            recommended,
            release: None,
        }
    }

    /// Attaches a callback releasing the native storage of this enumeration.
    pub fn with_release(mut self, release: impl FnOnce() + Send + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    pub fn visuals(&self) -> &[Option<CapabilityDescriptor>] {
        &self.visuals
    }

    /// Index of the visual the window system itself would pick, if any.
    pub fn recommended(&self) -> Option<usize> {
        self.recommended
            .filter(|&index| index < self.visuals.len())
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }
}

impl Drop for VisualList {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl fmt::Debug for VisualList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisualList")
            .field("visuals", &self.visuals)
            .field("recommended", &self.recommended)
            .finish_non_exhaustive()
    }
}

/// Picks a visual out of an enumeration.
pub trait CapabilitiesChooser: Send + Sync {
    /// Returns the index of the chosen entry in `available`.
    fn choose(
        &self,
        desired: &CapabilityDescriptor,
        available: &[Option<CapabilityDescriptor>],
        recommended: Option<usize>,
    ) -> Result<usize, NativeError>;
}

/// Prefers the window system's recommendation, otherwise picks the visual
/// with the smallest weighted attribute distance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCapabilitiesChooser;

impl DefaultCapabilitiesChooser {
    const MISMATCH_PENALTY: i64 = 1000;
    const SOFTWARE_PENALTY: i64 = 500;
    const COLOR_WEIGHT: i64 = 36;
    const DEPTH_WEIGHT: i64 = 6;
    const STENCIL_WEIGHT: i64 = 2;
    const ACCUM_WEIGHT: i64 = 1;
    const SAMPLE_WEIGHT: i64 = 4;

    fn score(desired: &CapabilityDescriptor, candidate: &CapabilityDescriptor) -> i64 {
        let diff = |a: u8, b: u8| (a as i64 - b as i64).abs();

        let mut score = 0;
        if desired.double_buffered != candidate.double_buffered {
            score += Self::MISMATCH_PENALTY;
        }
        if desired.stereo != candidate.stereo {
            score += Self::MISMATCH_PENALTY;
        }
        if desired.sample_buffers {
            if candidate.sample_buffers {
                score += Self::SAMPLE_WEIGHT * diff(desired.num_samples, candidate.num_samples);
            } else {
                score += Self::MISMATCH_PENALTY;
            }
        }
        if !candidate.hardware_accelerated {
            score += Self::SOFTWARE_PENALTY;
        }

        score += Self::COLOR_WEIGHT
            * (diff(desired.color.red, candidate.color.red)
                + diff(desired.color.green, candidate.color.green)
                + diff(desired.color.blue, candidate.color.blue)
                + diff(desired.color.alpha, candidate.color.alpha));
        score += Self::DEPTH_WEIGHT * diff(desired.depth_bits, candidate.depth_bits);
        score += Self::STENCIL_WEIGHT * diff(desired.stencil_bits, candidate.stencil_bits);
        score += Self::ACCUM_WEIGHT
            * (diff(desired.accum.red, candidate.accum.red)
                + diff(desired.accum.green, candidate.accum.green)
                + diff(desired.accum.blue, candidate.accum.blue)
                + diff(desired.accum.alpha, candidate.accum.alpha));
        score
    }
}

impl CapabilitiesChooser for DefaultCapabilitiesChooser {
    fn choose(
        &self,
        desired: &CapabilityDescriptor,
        available: &[Option<CapabilityDescriptor>],
        recommended: Option<usize>,
    ) -> Result<usize, NativeError> {
        if let Some(index) = recommended {
            if matches!(available.get(index), Some(Some(_))) {
                return Ok(index);
            }
        }

        available
            .iter()
            .enumerate()
            .filter_map(|(index, caps)| caps.as_ref().map(|caps| (index, Self::score(desired, caps))))
            .min_by_key(|&(_, score)| score)
            .map(|(index, _)| index)
            .ok_or(NativeError::NoUsableVisual(available.len()))
    }
}

/// Chooses the capabilities of a new surface on `device`.
///
/// The desired descriptor is validated before any visual is enumerated. The
/// chooser's answer is range checked; an out of range index or an unusable
/// entry is a configuration error.
pub fn choose_capabilities(
    provider: &dyn SurfaceProvider,
    device: &dyn GraphicsDevice,
    desired: &CapabilityDescriptor,
    chooser: &dyn CapabilitiesChooser,
) -> Result<CapabilityDescriptor, NativeError> {
    profile_function!();

    let attribs = desired.to_attrib_list(device::multisample_available(provider, device))?;
    let visuals = provider.enumerate_visuals(device, &attribs)?;

    let index = chooser.choose(desired, visuals.visuals(), visuals.recommended())?;
    if index >= visuals.len() {
        return Err(NativeError::InvalidChoice {
            index,
            count: visuals.len(),
        });
    }

    let chosen = visuals.visuals()[index].ok_or(NativeError::UnusableVisual(index))?;
    let chosen = chosen.with_onscreen(desired.onscreen);
    tracing::debug!(
        "chose visual {} of {} on {}: {:?}",
        index,
        visuals.len(),
        device.connection(),
        chosen
    );
    Ok(chosen)
}
