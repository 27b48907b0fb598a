use crate::session::{AdaptiveClient, MediaSurface, PlaybackStrategy, Readiness};

/// Playback through an adaptive-bitrate client for hosts that cannot decode
/// HLS themselves. The client owns manifest and segment fetching; readiness
/// is a parsed manifest.
pub struct AdaptivePlayback {
    surface: Box<dyn MediaSurface>,
    client: Box<dyn AdaptiveClient>,
    started: bool,
}

impl AdaptivePlayback {
    pub fn new(surface: Box<dyn MediaSurface>, client: Box<dyn AdaptiveClient>) -> Self {
        Self {
            surface,
            client,
            started: false,
        }
    }
}

impl PlaybackStrategy for AdaptivePlayback {
    fn start(&mut self, url: &str) {
        self.client.load(url);
        self.surface.attach_source(url);
        self.started = true;
    }

    fn readiness(&self) -> Readiness {
        Readiness::ManifestParsed
    }

    fn recover(&mut self) -> bool {
        self.client.recover_media()
    }

    fn dispose(&mut self) {
        if self.started {
            // Client first, then the surface: segment delivery has to stop
            // before the decoder lets go of the source.
            self.client.destroy();
            self.surface.detach_source();
            self.started = false;
        }
    }
}
