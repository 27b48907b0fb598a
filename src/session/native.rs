use crate::session::{MediaSurface, PlaybackStrategy, Readiness};

/// Playback via the host's own HLS decoder: point the surface straight at
/// the stream URL and wait for its metadata to load.
pub struct NativePlayback {
    surface: Box<dyn MediaSurface>,
    attached: bool,
}

impl NativePlayback {
    pub fn new(surface: Box<dyn MediaSurface>) -> Self {
        Self {
            surface,
            attached: false,
        }
    }
}

impl PlaybackStrategy for NativePlayback {
    fn start(&mut self, url: &str) {
        self.surface.attach_source(url);
        self.attached = true;
    }

    fn readiness(&self) -> Readiness {
        Readiness::MetadataLoaded
    }

    fn recover(&mut self) -> bool {
        // The host decoder exposes no recovery hook; a fatal media failure
        // stays fatal on this path.
        false
    }

    fn dispose(&mut self) {
        if self.attached {
            self.surface.detach_source();
            self.attached = false;
        }
    }
}
