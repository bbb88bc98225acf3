//! Human-readable output for playlists and hub events

use encore_core::Playlist;
use encore_playback::HubEvent;

/// `m:ss`, or `h:mm:ss` past the hour
pub fn clock(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

/// One line per entry, placeholders included
pub fn playlist_lines(playlist: &Playlist) -> Vec<String> {
    let mut lines = Vec::with_capacity(playlist.len() + 1);
    let title = playlist.show_title.as_deref().unwrap_or("untitled");
    lines.push(format!("{} - {} ({} tracks)", playlist.show_id, title, playlist.len()));

    for entry in &playlist.entries {
        let track = &entry.track;
        let length = track
            .length_hint_duration()
            .map(|d| clock(d.as_secs_f64()))
            .unwrap_or_else(|| "-:--".to_string());
        let set = track
            .set_label
            .as_deref()
            .map(|s| format!(" [{s}]"))
            .unwrap_or_default();
        let line = match &entry.resource {
            Ok(resource) => format!(
                "{:>3}. {:<40} {:>8}{}  {}",
                track.index + 1,
                track.title,
                length,
                set,
                resource.url
            ),
            Err(err) => format!(
                "{:>3}. {:<40} {:>8}{}  UNPLAYABLE: {}",
                track.index + 1,
                track.title,
                length,
                set,
                err
            ),
        };
        lines.push(line);
    }
    lines
}

/// Line to print for a hub event; `None` for the noisy ones
pub fn describe(event: &HubEvent) -> Option<String> {
    let line = match event {
        HubEvent::TrackChanged { index, title, .. } => format!("> {:>2}. {title}", index + 1),
        HubEvent::TrackFailed {
            index,
            error,
            terminal: true,
            ..
        } => format!("! track {} failed: {error}", index + 1),
        HubEvent::RetryScheduled {
            index,
            attempt,
            delay,
            ..
        } => format!(
            "~ track {} retry {attempt} in {:.1}s",
            index + 1,
            delay.as_secs_f64()
        ),
        HubEvent::ShowCompleted { show, .. } => format!("= {show} complete"),
        HubEvent::ShowLoadFailed { show, error, .. } => format!("! {show}: {error}"),
        HubEvent::NetworkChanged { state } => format!(
            "network {}",
            if state.available { "up" } else { "down" }
        ),
        HubEvent::StateChanged { .. }
        | HubEvent::TrackReady { .. }
        | HubEvent::TrackFailed { .. }
        | HubEvent::TrackEnded { .. }
        | HubEvent::Progress { .. }
        | HubEvent::ActiveSourceChanged { .. }
        | HubEvent::FavoriteChanged { .. } => return None,
    };
    Some(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use encore_core::{
        PlaylistEntry, PlaylistResource, ResolutionError, ShowId, SourceId, Track,
    };
    use std::time::Duration;
    use url::Url;

    #[test]
    fn clock_formats() {
        assert_eq!(clock(0.0), "0:00");
        assert_eq!(clock(272.9), "4:32");
        assert_eq!(clock(3725.0), "1:02:05");
        assert_eq!(clock(f64::NAN), "0:00");
    }

    #[test]
    fn placeholders_are_listed_in_place() {
        let ok = PlaylistEntry::resolved(
            Track::new(0, "Sugaree", "t01.mp3").with_length_hint("9:12"),
            PlaylistResource {
                track_index: 0,
                url: Url::parse("https://media.example.test/jg/t01.mp3").unwrap(),
                range_hint: None,
                is_likely_large_single_file: false,
            },
        );
        let bad = PlaylistEntry::placeholder(
            Track::new(1, "Tore Up", ".."),
            ResolutionError::invalid_resource(1, "bad filename"),
        );
        let playlist = Playlist::new(ShowId::new("jg1976-07-18"), vec![ok, bad]);

        let lines = playlist_lines(&playlist);
        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Sugaree") && lines[1].contains("9:12"));
        assert!(lines[2].contains("UNPLAYABLE"));
    }

    #[test]
    fn only_terminal_failures_are_reported() {
        let transient = HubEvent::TrackFailed {
            source: SourceId::Dead,
            index: 0,
            error: "reset".to_string(),
            terminal: false,
        };
        assert_eq!(describe(&transient), None);

        let retry = HubEvent::RetryScheduled {
            source: SourceId::Dead,
            index: 0,
            attempt: 1,
            delay: Duration::from_secs(1),
        };
        assert_eq!(describe(&retry).as_deref(), Some("~ track 1 retry 1 in 1.0s"));
    }
}
