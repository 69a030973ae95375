//! Overlay registry: the sprites of the active identity and their use per frame.
//!
//! Assets are laid out as `{root}/{identity}/{identity}_{feature}.png`. The
//! eyebrow variant replaces the two eye sprites with
//! `{identity}_{right|left}_eyebrows.png`.

use crate::compositor::{blend, Frame};
use crate::config::{ConfigStore, OverlayConfig};
use crate::geometry::Placements;
use crate::keypoints::Feature;
use crate::shared::{Snapshot, Versioned};
use crate::sprite::Sprite;
use crate::transform::transform;
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const EYES: [Feature; 2] = [Feature::RightEye, Feature::LeftEye];

/// Loaded sprites of one identity
#[derive(Debug, Clone, PartialEq)]
pub struct SpriteSet {
    identity: String,
    generation: u64,
    eyebrows: bool,
    sprites: BTreeMap<Feature, Arc<Sprite>>,
}

impl SpriteSet {
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Number of the identity load this set came from
    ///
    /// Changes on every [`OverlayRegistry::load_overlays`], but not when
    /// only the eye variant is swapped.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the eye sprites are the eyebrow variant
    #[must_use]
    pub fn eyebrows(&self) -> bool {
        self.eyebrows
    }

    #[must_use]
    pub fn get(&self, feature: Feature) -> Option<&Sprite> {
        self.sprites.get(&feature).map(AsRef::as_ref)
    }

    /// Features with a usable sprite
    pub fn features(&self) -> impl Iterator<Item = Feature> + '_ {
        self.sprites.keys().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Transform and blend every enabled feature that has both a placement and a sprite
    ///
    /// Returns the number of sprites that landed on the frame.
    ///
    /// # Errors
    ///
    /// Returns `ResourceExhausted` if a transform exceeds its pixel budget;
    /// `frame` may then be partially composited
    pub fn apply(&self, frame: &mut Frame, placements: &Placements, config: &OverlayConfig) -> Result<usize> {
        let mut drawn = 0;
        for (&feature, placement) in placements {
            if !config.is_enabled(feature) {
                continue;
            }
            let Some(sprite) = self.sprites.get(&feature) else {
                continue;
            };

            let transformed = transform(sprite, placement.scale, placement.angle)?;
            if blend(frame, &transformed, placement.position.x, placement.position.y) {
                drawn += 1;
            }
        }
        Ok(drawn)
    }
}

/// Outcome of a (possibly partial) sprite load
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Identity the sprites belong to
    pub identity: String,
    /// Features loaded from disk
    pub loaded: Vec<Feature>,
    /// Eyes derived by mirroring the other eye
    pub derived: Vec<Feature>,
    /// Features that failed to load, with the reason
    pub failures: Vec<(Feature, String)>,
}

impl LoadReport {
    /// True when no feature failed
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Features usable for compositing after this load
    pub fn available(&self) -> impl Iterator<Item = Feature> + '_ {
        self.loaded.iter().chain(self.derived.iter()).copied()
    }
}

/// Path of a feature sprite inside the identity's directory
#[must_use]
pub fn sprite_path(root: &Path, identity: &str, feature: Feature, eyebrows: bool) -> PathBuf {
    let file_name = match feature {
        Feature::RightEye if eyebrows => format!("{identity}_right_eyebrows.png"),
        Feature::LeftEye if eyebrows => format!("{identity}_left_eyebrows.png"),
        _ => format!("{identity}_{feature}.png"),
    };
    root.join(identity).join(file_name)
}

/// Identities available under `root`, one per sub-directory, sorted
///
/// # Errors
///
/// Returns `NoAssets` if `root` cannot be read or has no sub-directories
pub fn list_identities(root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(root)
        .map_err(|e| Error::NoAssets(format!("{} ({e})", root.display())))?;

    let mut identities: Vec<String> = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.path().is_dir())
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| !name.starts_with('.'))
        .collect();

    if identities.is_empty() {
        return Err(Error::NoAssets(root.display().to_string()));
    }
    identities.sort();
    Ok(identities)
}

/// Owner of the active identity's sprites
///
/// Cloning yields another handle to the same registry; the UI thread loads
/// and toggles while the pipeline thread composites.
#[derive(Debug, Clone)]
pub struct OverlayRegistry {
    asset_root: PathBuf,
    config: ConfigStore,
    sprites: Versioned<Option<Arc<SpriteSet>>>,
    loads: Arc<AtomicU64>,
}

impl OverlayRegistry {
    pub fn new(asset_root: impl Into<PathBuf>, config: ConfigStore) -> Self {
        Self {
            asset_root: asset_root.into(),
            config,
            sprites: Versioned::new(None),
            loads: Arc::new(AtomicU64::new(0)),
        }
    }

    #[must_use]
    pub fn asset_root(&self) -> &Path {
        &self.asset_root
    }

    /// Shared overlay configuration
    #[must_use]
    pub fn config(&self) -> &ConfigStore {
        &self.config
    }

    /// Identities available under the asset root
    ///
    /// # Errors
    ///
    /// See [`list_identities`]
    pub fn identities(&self) -> Result<Vec<String>> {
        list_identities(&self.asset_root)
    }

    /// Load all sprites of `identity`, replacing the active set
    ///
    /// Missing or broken sprites are reported in the returned [`LoadReport`]
    /// and loading continues with the rest. If exactly one eye loads, the
    /// other is derived by mirroring it.
    ///
    /// # Errors
    ///
    /// Returns `UnknownIdentity` if there is no directory for `identity`, or
    /// `NoSprites` if not a single sprite loaded. The active set is left
    /// unchanged on error.
    pub fn load_overlays(&self, identity: &str) -> Result<LoadReport> {
        let directory = self.identity_dir(identity)?;
        let eyebrows = self.config.snapshot().eyebrows();

        let mut report = LoadReport {
            identity: identity.to_string(),
            ..LoadReport::default()
        };
        let mut sprites = self.load_features(identity, &Feature::ALL, eyebrows, &mut report);
        derive_missing_eye(&mut sprites, &mut report);

        if sprites.is_empty() {
            return Err(Error::NoSprites(format!("{identity} in {}", directory.display())));
        }

        let generation = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        self.sprites.replace(Some(Arc::new(SpriteSet {
            identity: identity.to_string(),
            generation,
            eyebrows,
            sprites,
        })));
        log::info!(
            "Loaded overlay identity '{identity}': {} sprites, {} derived, {} missing",
            report.loaded.len(),
            report.derived.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// Switch the eye sprites between the plain and eyebrow variants
    ///
    /// Only the two eye sprites are reloaded. Returns `None` when no
    /// identity is loaded yet; the setting then applies to the next load.
    ///
    /// # Errors
    ///
    /// Returns `NoSprites` if neither eye variant could be loaded; the
    /// setting and the active sprites are then left unchanged
    pub fn set_eyebrows(&self, eyebrows: bool) -> Result<Option<LoadReport>> {
        let Some(current) = self.sprites() else {
            self.config.update(|config| config.set_eyebrows(eyebrows));
            return Ok(None);
        };

        let identity = current.identity().to_string();
        let mut report = LoadReport {
            identity: identity.clone(),
            ..LoadReport::default()
        };
        let mut eyes = self.load_features(&identity, &EYES, eyebrows, &mut report);
        derive_missing_eye(&mut eyes, &mut report);
        if eyes.is_empty() {
            return Err(Error::NoSprites(format!(
                "{identity} ({} eyes)",
                if eyebrows { "eyebrow" } else { "plain" }
            )));
        }

        let mut sprites = current.sprites.clone();
        sprites.retain(|feature, _| !feature.is_eye());
        sprites.extend(eyes);

        self.config.update(|config| config.set_eyebrows(eyebrows));
        self.sprites.replace(Some(Arc::new(SpriteSet {
            identity,
            generation: current.generation,
            eyebrows,
            sprites,
        })));
        log::info!("Eyebrow overlays {}", if eyebrows { "enabled" } else { "disabled" });
        Ok(Some(report))
    }

    /// Show or hide a feature from the next composited frame on
    pub fn toggle_feature(&self, feature: Feature, enabled: bool) {
        self.config.update(|config| config.set_enabled(feature, enabled));
        log::debug!("{feature} overlay {}", if enabled { "shown" } else { "hidden" });
    }

    /// Composite the active sprites into `frame`
    ///
    /// Draws nothing when no identity is loaded.
    ///
    /// # Errors
    ///
    /// See [`SpriteSet::apply`]
    pub fn apply_overlays(&self, frame: &mut Frame, placements: &Placements, config: &OverlayConfig) -> Result<usize> {
        match self.sprites() {
            Some(set) => set.apply(frame, placements, config),
            None => Ok(0),
        }
    }

    /// Currently active sprite set
    #[must_use]
    pub fn sprites(&self) -> Option<Arc<SpriteSet>> {
        self.sprites.snapshot().as_ref().map(Arc::clone)
    }

    /// Sprite set together with its version, for change detection
    #[must_use]
    pub fn sprite_snapshot(&self) -> Snapshot<Option<Arc<SpriteSet>>> {
        self.sprites.snapshot()
    }

    #[must_use]
    pub fn active_identity(&self) -> Option<String> {
        self.sprites().map(|set| set.identity().to_string())
    }

    #[must_use]
    pub fn has_identity(&self) -> bool {
        self.sprites().is_some()
    }

    fn identity_dir(&self, identity: &str) -> Result<PathBuf> {
        let is_plain_name = !identity.is_empty()
            && !identity.starts_with('.')
            && !identity.contains(['/', '\\']);
        let directory = self.asset_root.join(identity);
        if is_plain_name && directory.is_dir() {
            Ok(directory)
        } else {
            Err(Error::UnknownIdentity(identity.to_string()))
        }
    }

    fn load_features(
        &self,
        identity: &str,
        features: &[Feature],
        eyebrows: bool,
        report: &mut LoadReport,
    ) -> BTreeMap<Feature, Arc<Sprite>> {
        let mut sprites = BTreeMap::new();
        for &feature in features {
            let path = sprite_path(&self.asset_root, identity, feature, eyebrows);
            match Sprite::load(&path, feature) {
                Ok(sprite) => {
                    log::debug!("Loaded {feature} sprite {}x{} from {}", sprite.width(), sprite.height(), path.display());
                    sprites.insert(feature, Arc::new(sprite));
                    report.loaded.push(feature);
                }
                Err(e) => {
                    log::warn!("{e}");
                    report.failures.push((feature, e.to_string()));
                }
            }
        }
        sprites
    }
}

/// Fill a single missing eye with the mirror image of the other one
fn derive_missing_eye(sprites: &mut BTreeMap<Feature, Arc<Sprite>>, report: &mut LoadReport) {
    let present: Vec<Feature> = EYES.into_iter().filter(|eye| sprites.contains_key(eye)).collect();
    let [source] = present.as_slice() else {
        return;
    };
    let Some(target) = source.opposite_eye() else {
        return;
    };
    let Some(mirrored) = sprites.get(source).map(|sprite| sprite.mirrored()) else {
        return;
    };

    log::warn!("Deriving {target} overlay by mirroring {source}");
    sprites.insert(target, Arc::new(mirrored));
    report.derived.push(target);
}
