mod common;

use cadence_lib::config::Config;
use cadence_lib::library::models::{Song, Tag};
use cadence_lib::playback::{PlaybackStatus, VolumeLevel};
use cadence_lib::queue::PlayerLocation;
use cadence_lib::{AppError, PlayerEvent};
use common::*;
use std::fs;
use uuid::Uuid;

/// Scans a folder with three tagged tracks and returns their uuids in
/// track order.
async fn library_of_three(engine: &cadence_lib::Engine, dir: &std::path::Path) -> Vec<Uuid> {
    for (file, title) in [("01.wav", "One"), ("02.wav", "Two"), ("03.wav", "Three")] {
        write_tagged_wav(&dir.join(file), 1, title, "Band", "Record");
    }
    engine.scan_library(dir).await.unwrap();

    let library = engine.get_library().await;
    let mut songs: Vec<_> = library
        .iter()
        .map(|s| (s.primary_location().unwrap().to_path_buf(), s.uuid))
        .collect();
    songs.sort();
    songs.into_iter().map(|(_, uuid)| uuid).collect()
}

#[tokio::test]
async fn test_scan_reads_tags_and_reports_bad_files() {
    let dir = tempfile::tempdir().unwrap();
    write_tagged_wav(&dir.path().join("tagged.wav"), 1, "Title", "Artist", "Album");
    write_wav(&dir.path().join("plain.wav"), 1);
    fs::write(dir.path().join("notes.txt"), "not audio").unwrap();
    fs::write(dir.path().join("broken.flac"), b"definitely not flac").unwrap();

    let (engine, _) = start_engine().await;
    let mut rx = engine.subscribe();
    let report = engine.scan_library(dir.path()).await.unwrap();

    assert_eq!(report.added, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(report.warnings[0], AppError::ScanIo { .. }));
    assert_eq!(
        wait_for(&mut rx, "library_loaded").await,
        PlayerEvent::LibraryLoaded { songs: 2 }
    );

    let library = engine.get_library().await;
    let tagged = library
        .iter()
        .find(|s| s.get_tag(&Tag::Title) == Some("Title"))
        .unwrap();
    assert_eq!(tagged.get_tag(&Tag::Artist), Some("Artist"));
    assert_eq!(tagged.get_tag(&Tag::Album), Some("Album"));
    assert!((tagged.duration - 1.0).abs() < 0.05);

    let plain = library.iter().find(|s| s.uuid != tagged.uuid).unwrap();
    assert_eq!(plain.title(), "plain");

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_rescan_keeps_identity() {
    let dir = tempfile::tempdir().unwrap();
    write_tagged_wav(&dir.path().join("a.wav"), 1, "Old", "Band", "Record");

    let (engine, _) = start_engine().await;
    engine.scan_library(dir.path()).await.unwrap();
    let before = engine.get_library().await;

    write_tagged_wav(&dir.path().join("a.wav"), 2, "New", "Band", "Record");
    let report = engine.scan_library(dir.path()).await.unwrap();
    let after = engine.get_library().await;

    assert_eq!(report.added, 0);
    assert_eq!(report.updated, 1);
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].uuid, before[0].uuid);
    assert_eq!(after[0].get_tag(&Tag::Title), Some("New"));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_scan_of_missing_folder_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine().await;
    let result = engine.scan_library(&dir.path().join("nope")).await;
    assert!(matches!(result, Err(AppError::FileSystem(_))));
    assert!(engine.create_library(&dir.path().join("nope")).await.is_err());
    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_create_library_scans_in_background() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("a.wav"), 1);

    let (engine, _) = start_engine().await;
    let mut rx = engine.subscribe();
    engine.create_library(dir.path()).await.unwrap();

    assert_eq!(
        wait_for(&mut rx, "library_loaded").await,
        PlayerEvent::LibraryLoaded { songs: 1 }
    );
    assert_eq!(
        engine.config().default_library().map(|l| l.path.clone()),
        Some(dir.path().to_path_buf())
    );
    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queue_plays_through_and_stops() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    let mut rx = engine.subscribe();

    engine
        .add_song_to_queue(songs[0], PlayerLocation::Library)
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[1], PlayerLocation::Library)
        .await
        .unwrap();
    engine.play().await;

    match wait_for(&mut rx, "now_playing_change").await {
        PlayerEvent::NowPlayingChange { song } => assert_eq!(song.uuid, songs[0]),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Playing
    );

    backend.finish_current();
    assert_eq!(
        wait_for(&mut rx, "track_finished").await,
        PlayerEvent::TrackFinished {
            song: songs[0],
            played: engine.get_song(songs[0]).await.unwrap().duration,
        }
    );
    match wait_for(&mut rx, "now_playing_change").await {
        PlayerEvent::NowPlayingChange { song } => assert_eq!(song.uuid, songs[1]),
        other => panic!("unexpected {:?}", other),
    }
    let queue = engine.get_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].0.uuid, songs[1]);

    backend.finish_current();
    wait_for(&mut rx, "stopped").await;
    assert!(engine.get_queue().await.is_empty());
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Stopped
    );
    assert_eq!(engine.get_song(songs[0]).await.unwrap().plays, 1);
    assert_eq!(engine.get_song(songs[1]).await.unwrap().plays, 1);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_load_skips_to_next() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    let mut rx = engine.subscribe();

    for song in &songs[..2] {
        engine
            .add_song_to_queue(*song, PlayerLocation::Library)
            .await
            .unwrap();
    }
    engine.play().await;
    backend.fail_current("decoder exploded");

    match wait_for(&mut rx, "playback_error").await {
        PlayerEvent::PlaybackError { code, .. } => assert_eq!(code, "backend_load"),
        other => panic!("unexpected {:?}", other),
    }
    wait_for(&mut rx, "queue_updated").await;
    let queue = engine.get_queue().await;
    assert_eq!(queue[0].0.uuid, songs[1]);
    assert_eq!(engine.get_song(songs[0]).await.unwrap().plays, 0);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remove_from_queue_out_of_range_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    for song in &songs {
        engine
            .add_song_to_queue(*song, PlayerLocation::Library)
            .await
            .unwrap();
    }
    let before = engine.get_queue().await;

    assert_eq!(
        engine.remove_from_queue(3).await,
        Err(AppError::OutOfRange { index: 3, len: 3 })
    );
    assert_eq!(
        engine.remove_from_queue(0).await,
        Err(AppError::OutOfRange { index: 0, len: 3 })
    );
    assert_eq!(engine.get_queue().await, before);

    engine.remove_from_queue(1).await.unwrap();
    let after: Vec<Uuid> = engine
        .get_queue()
        .await
        .iter()
        .map(|(s, _)| s.uuid)
        .collect();
    assert_eq!(after, vec![songs[0], songs[2]]);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_queue_ordering_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;

    engine
        .add_song_to_queue(songs[0], PlayerLocation::Library)
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[1], PlayerLocation::Library)
        .await
        .unwrap();
    engine
        .play_next_queue(songs[2], PlayerLocation::Library)
        .await
        .unwrap();
    let order: Vec<Uuid> = engine
        .get_queue()
        .await
        .iter()
        .map(|(s, _)| s.uuid)
        .collect();
    assert_eq!(order, vec![songs[0], songs[2], songs[1]]);

    engine.queue_move_to(2).await.unwrap();
    let order: Vec<Uuid> = engine
        .get_queue()
        .await
        .iter()
        .map(|(s, _)| s.uuid)
        .collect();
    assert_eq!(order, vec![songs[1], songs[2]]);
    assert_eq!(backend.load_count(), 1);
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Playing
    );

    engine
        .play_now(songs[0], PlayerLocation::Library)
        .await
        .unwrap();
    let library: Vec<Uuid> = engine.get_library().await.iter().map(|s| s.uuid).collect();
    let position = library.iter().position(|uuid| *uuid == songs[0]).unwrap();
    let queue = engine.get_queue().await;
    assert_eq!(queue[0].0.uuid, songs[0]);
    assert_eq!(queue[1].0.uuid, songs[2]);
    assert_eq!(queue.len(), 2 + library.len() - 1 - position);

    engine.clear_queue().await.unwrap();
    let order: Vec<Uuid> = engine
        .get_queue()
        .await
        .iter()
        .map(|(s, _)| s.uuid)
        .collect();
    assert_eq!(order, vec![songs[0]]);

    assert!(matches!(
        engine
            .add_song_to_queue(Uuid::new_v4(), PlayerLocation::Library)
            .await,
        Err(AppError::NotFound(_))
    ));
    assert!(matches!(
        engine
            .add_song_to_queue(songs[0], PlayerLocation::Playlist(Uuid::new_v4()))
            .await,
        Err(AppError::NotFound(_))
    ));

    engine.shutdown().await.unwrap();
}

fn queue_order(queue: &[(Song, PlayerLocation)]) -> Vec<Uuid> {
    queue.iter().map(|(s, _)| s.uuid).collect()
}

#[tokio::test]
async fn test_play_now_from_playlist_continues_through_it() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    let playlist = engine.create_playlist("Run").await.unwrap();
    for song in [songs[2], songs[0], songs[1]] {
        engine.add_song_to_playlist(playlist.uuid, song).await.unwrap();
    }
    let mut rx = engine.subscribe();

    engine
        .play_now(songs[0], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[2], PlayerLocation::Library)
        .await
        .unwrap();
    let queue = engine.get_queue().await;
    assert_eq!(queue_order(&queue), vec![songs[0], songs[2], songs[1]]);
    assert_eq!(queue[2].1, PlayerLocation::Playlist(playlist.uuid));

    match wait_for(&mut rx, "now_playing_change").await {
        PlayerEvent::NowPlayingChange { song } => assert_eq!(song.uuid, songs[0]),
        other => panic!("unexpected {:?}", other),
    }
    backend.finish_current();
    match wait_for(&mut rx, "now_playing_change").await {
        PlayerEvent::NowPlayingChange { song } => assert_eq!(song.uuid, songs[2]),
        other => panic!("unexpected {:?}", other),
    }
    backend.finish_current();
    match wait_for(&mut rx, "now_playing_change").await {
        PlayerEvent::NowPlayingChange { song } => assert_eq!(song.uuid, songs[1]),
        other => panic!("unexpected {:?}", other),
    }
    backend.finish_current();
    wait_for(&mut rx, "stopped").await;
    assert!(engine.get_queue().await.is_empty());
    assert_eq!(backend.load_count(), 3);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_up_next_respects_limit_and_is_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine_with(Config {
        up_next_limit: 1,
        ..test_config()
    })
    .await;
    let songs = library_of_three(&engine, dir.path()).await;
    let playlist = engine.create_playlist("Capped").await.unwrap();
    for song in &songs {
        engine.add_song_to_playlist(playlist.uuid, *song).await.unwrap();
    }

    engine
        .play_now(songs[0], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();
    assert_eq!(queue_order(&engine.get_queue().await), vec![songs[0], songs[1]]);

    // The last track of a playlist has nothing after it.
    engine
        .play_now(songs[2], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();
    assert_eq!(queue_order(&engine.get_queue().await), vec![songs[2]]);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shuffle_plays_every_song_once() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    let mut rx = engine.subscribe();

    for song in &songs {
        engine
            .add_song_to_queue(*song, PlayerLocation::Library)
            .await
            .unwrap();
    }
    engine.queue_shuffle(true).await.unwrap();
    assert!(engine.get_playback_state().await.shuffle);
    engine.play().await;

    let mut played = Vec::new();
    for _ in 0..songs.len() {
        match wait_for(&mut rx, "now_playing_change").await {
            PlayerEvent::NowPlayingChange { song } => played.push(song.uuid),
            other => panic!("unexpected {:?}", other),
        }
        backend.finish_current();
    }
    wait_for(&mut rx, "stopped").await;

    played.sort();
    let mut expected = songs.clone();
    expected.sort();
    assert_eq!(played, expected);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remove_song_in_use_and_cascade() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;

    let playlist = engine.create_playlist("Mix").await.unwrap();
    engine
        .add_song_to_playlist(playlist.uuid, songs[0])
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[1], PlayerLocation::Library)
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[0], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();

    assert!(matches!(
        engine.remove_song(songs[0], false).await,
        Err(AppError::InUse(_))
    ));
    assert_eq!(engine.get_library().await.len(), 3);

    engine.remove_song(songs[0], true).await.unwrap();
    assert_eq!(engine.get_library().await.len(), 2);
    assert!(engine.get_playlist(playlist.uuid).await.unwrap().is_empty());
    assert_eq!(engine.get_queue().await.len(), 1);

    engine.remove_song(songs[2], false).await.unwrap();
    assert!(matches!(
        engine.get_song(songs[2]).await,
        Err(AppError::NotFound(_))
    ));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remove_playing_song_moves_on() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;

    engine
        .add_song_to_queue(songs[0], PlayerLocation::Library)
        .await
        .unwrap();
    engine
        .add_song_to_queue(songs[1], PlayerLocation::Library)
        .await
        .unwrap();
    engine.play().await;

    engine.remove_song(songs[0], true).await.unwrap();
    let queue = engine.get_queue().await;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].0.uuid, songs[1]);
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Playing
    );

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_import_m3u_skips_missing_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_tagged_wav(&dir.path().join("a.wav"), 1, "A", "Band", "Record");
    write_tagged_wav(&dir.path().join("b.wav"), 1, "B", "Band", "Record");
    let m3u = dir.path().join("mix.m3u");
    fs::write(
        &m3u,
        "#EXTM3U\n#EXTINF:1,Band - A\na.wav\nmissing.wav\n\nb.wav\n",
    )
    .unwrap();

    let (engine, _) = start_engine().await;
    let mut rx = engine.subscribe();
    let playlist = engine.import_playlist(&m3u).await.unwrap();

    assert_eq!(playlist.name, "mix");
    assert_eq!(playlist.tracks.len(), 2);
    let titles: Vec<String> = engine
        .get_playlist(playlist.uuid)
        .await
        .unwrap()
        .iter()
        .map(|s| s.title())
        .collect();
    assert_eq!(titles, vec!["A", "B"]);
    assert_eq!(engine.get_library().await.len(), 2);

    match wait_for(&mut rx, "playlists_gotten").await {
        PlayerEvent::PlaylistsGotten { playlists } => assert_eq!(playlists.len(), 1),
        other => panic!("unexpected {:?}", other),
    }

    let exported = dir.path().join("out.m3u8");
    engine
        .export_playlist(playlist.uuid, &exported)
        .await
        .unwrap();
    let content = fs::read_to_string(&exported).unwrap();
    assert!(content.starts_with("#EXTM3U"));
    assert!(content.contains("Band - A"));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_playlist_commands() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, _) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;

    assert!(matches!(
        engine.create_playlist("  ").await,
        Err(AppError::InvalidInput(_))
    ));
    let playlist = engine.create_playlist("Road").await.unwrap();
    engine
        .add_song_to_playlist(playlist.uuid, songs[2])
        .await
        .unwrap();
    engine
        .add_song_to_playlist(playlist.uuid, songs[0])
        .await
        .unwrap();
    assert!(matches!(
        engine.add_song_to_playlist(playlist.uuid, Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));

    let tracks: Vec<Uuid> = engine
        .get_playlist(playlist.uuid)
        .await
        .unwrap()
        .iter()
        .map(|s| s.uuid)
        .collect();
    assert_eq!(tracks, vec![songs[2], songs[0]]);

    engine
        .remove_from_lib_playlist(songs[2], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();
    assert_eq!(engine.get_playlist(playlist.uuid).await.unwrap().len(), 1);
    assert_eq!(engine.get_library().await.len(), 3);

    engine
        .add_song_to_queue(songs[0], PlayerLocation::Playlist(playlist.uuid))
        .await
        .unwrap();
    engine.delete_playlist(playlist.uuid).await.unwrap();
    assert!(engine.get_playlists().await.is_empty());
    assert_eq!(engine.get_queue().await.len(), 1);
    assert!(matches!(
        engine.delete_playlist(playlist.uuid).await,
        Err(AppError::NotFound(_))
    ));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_transport_controls() {
    let dir = tempfile::tempdir().unwrap();
    let (engine, backend) = start_engine().await;
    let songs = library_of_three(&engine, dir.path()).await;
    for song in &songs {
        engine
            .add_song_to_queue(*song, PlayerLocation::Library)
            .await
            .unwrap();
    }

    engine.seek(500).await;
    assert_eq!(engine.get_playback_state().await.position, 0.0);

    engine.play().await;
    engine.pause().await;
    engine.pause().await;
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Paused
    );

    engine.seek(60_000).await;
    let state = engine.get_playback_state().await;
    assert_eq!(state.status, PlaybackStatus::Paused);
    assert!((state.position - state.duration).abs() < 1e-9);

    engine.play().await;
    engine.next().await;
    assert_eq!(engine.get_queue().await[0].0.uuid, songs[1]);
    assert_eq!(engine.get_song(songs[0]).await.unwrap().skips, 1);

    engine.prev().await;
    assert_eq!(engine.get_queue().await[0].0.uuid, songs[0]);

    engine.stop().await;
    assert_eq!(
        engine.get_playback_state().await.status,
        PlaybackStatus::Stopped
    );
    assert_eq!(engine.get_queue().await.len(), 3);
    assert_eq!(backend.load_count(), 3);

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_volume_from_string() {
    let (engine, backend) = start_engine().await;

    engine.set_volume("40%".parse::<VolumeLevel>().unwrap()).await;
    assert_eq!(engine.get_playback_state().await.volume, 0.4);
    assert_eq!(backend.volume(), 0.4);

    engine.set_volume(VolumeLevel::from(7.0)).await;
    assert_eq!(engine.get_playback_state().await.volume, 1.0);
    assert!("very loud".parse::<VolumeLevel>().is_err());

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_album_art_from_folder_image() {
    let dir = tempfile::tempdir().unwrap();
    write_wav(&dir.path().join("a.wav"), 1);
    fs::write(dir.path().join("cover.png"), [0x89, b'P', b'N', b'G']).unwrap();

    let (engine, _) = start_engine().await;
    engine.scan_library(dir.path()).await.unwrap();
    let song = engine.get_library().await[0].uuid;

    let art = engine.album_art(song).await.unwrap();
    assert_eq!(art.mime, "image/png");
    assert!(art.to_data_url().starts_with("data:image/png;base64,"));
    assert!(matches!(
        engine.album_art(Uuid::new_v4()).await,
        Err(AppError::NotFound(_))
    ));

    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    let config = Config {
        database_path: Some(dir.path().join("library.db")),
        ..test_config()
    };

    let (engine, _) = start_engine_with(config.clone()).await;
    let songs = library_of_three(&engine, &music).await;
    let playlist = engine.create_playlist("Kept").await.unwrap();
    engine
        .add_song_to_playlist(playlist.uuid, songs[1])
        .await
        .unwrap();
    engine.set_volume(VolumeLevel::new(0.25)).await;
    engine.shutdown().await.unwrap();

    let (engine, backend) = start_engine_with(config).await;
    let library = engine.get_library().await;
    let mut restored: Vec<Uuid> = library.iter().map(|s| s.uuid).collect();
    restored.sort();
    let mut expected = songs.clone();
    expected.sort();
    assert_eq!(restored, expected);
    assert!(library.iter().all(|s| s.get_tag(&Tag::Artist) == Some("Band")));
    let playlists = engine.get_playlists().await;
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].tracks, vec![songs[1]]);
    assert_eq!(engine.get_playback_state().await.volume, 0.25);
    assert_eq!(backend.volume(), 0.25);
    engine.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_commands_store_state_without_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let music = dir.path().join("music");
    fs::create_dir(&music).unwrap();
    write_tagged_wav(&music.join("01.wav"), 1, "One", "Band", "Record");
    write_tagged_wav(&music.join("02.wav"), 1, "Two", "Band", "Record");
    let config = Config {
        database_path: Some(dir.path().join("library.db")),
        ..test_config()
    };

    let (engine, _) = start_engine_with(config.clone()).await;
    let mut rx = engine.subscribe();
    engine.create_library(&music).await.unwrap();
    wait_for(&mut rx, "library_loaded").await;

    let library = engine.get_library().await;
    assert_eq!(library.len(), 2);
    let kept = library.iter().find(|s| s.title() == "One").unwrap().uuid;
    let removed = library.iter().find(|s| s.title() == "Two").unwrap().uuid;

    let playlist = engine.create_playlist("Kept").await.unwrap();
    engine.add_song_to_playlist(playlist.uuid, kept).await.unwrap();
    let doomed = engine.create_playlist("Doomed").await.unwrap();
    engine.delete_playlist(doomed.uuid).await.unwrap();
    engine.remove_song(removed, false).await.unwrap();

    // Simulates a crash: no shutdown, so nothing is flushed at exit.
    drop(engine);

    let (engine, _) = start_engine_with(config).await;
    let library = engine.get_library().await;
    assert_eq!(library.iter().map(|s| s.uuid).collect::<Vec<_>>(), vec![kept]);
    let playlists = engine.get_playlists().await;
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0].name, "Kept");
    assert_eq!(playlists[0].tracks, vec![kept]);
    engine.shutdown().await.unwrap();
}
