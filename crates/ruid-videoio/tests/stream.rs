use ruid_videoio::{frame_stream, SyntheticSource, VideoIo, VideoIoConfig};
use tokio_stream::StreamExt;

fn video(frames: u64) -> VideoIo {
    let mut config = VideoIoConfig::new((8, 8), "clip.mp4");
    config.buffer_size = 2;
    let src = SyntheticSource::new(8, 8).with_limit(frames);
    VideoIo::with_source(config, Box::new(src), None).unwrap()
}

#[tokio::test]
async fn stream_yields_every_frame_in_order() {
    let frames: Vec<u64> = frame_stream(video(12))
        .map(|f| f.unwrap().index)
        .collect()
        .await;
    assert_eq!(frames, (0..12).collect::<Vec<_>>());
}

#[tokio::test]
async fn dropping_stream_stops_capture() {
    let src = SyntheticSource::new(8, 8);
    let produced = src.counter();
    let mut config = VideoIoConfig::new((8, 8), "clip.mp4");
    config.buffer_size = 2;
    let io = VideoIo::with_source(config, Box::new(src), None).unwrap();

    let mut stream = Box::pin(frame_stream(io));
    for expected in 0..3 {
        assert_eq!(stream.next().await.unwrap().unwrap().index, expected);
    }
    drop(stream);

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    let settled = produced.load(std::sync::atomic::Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(produced.load(std::sync::atomic::Ordering::SeqCst), settled);
}
