use std::env;
use std::sync::Arc;

use tube_vault::core::config::LookupConfig;
use tube_vault::{CaptionEntry, HttpYoutubeBackend, VideoLookup, VideoMetadataView};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: lookup_cli <youtube-url-or-id> [max-captions]");
        std::process::exit(1);
    }

    let input = args[1].clone();
    let max_captions = args
        .get(2)
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(10);

    tube_vault::utils::init_tracing_with(Some("warn"));

    let backend = match HttpYoutubeBackend::new(&LookupConfig::default()) {
        Ok(backend) => backend,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };
    let lookup = VideoLookup::new(Arc::new(backend));

    let video = match lookup.get_video_data(&input).await {
        Ok(video) => video,
        Err(error) => {
            eprintln!("Error: {error}");
            std::process::exit(1);
        }
    };
    print_video(&video);

    match lookup.get_transcripts(&video.video_id).await {
        Ok(captions) => print_captions(&captions, max_captions),
        Err(error) => eprintln!("Captions unavailable: {error}"),
    }
}

fn print_video(video: &VideoMetadataView) {
    println!("Title: {}", video.title);
    println!("Video id: {}", video.video_id);
    println!(
        "Channel: {}{}",
        video.channel_name,
        if video.is_verified { " ✓" } else { "" }
    );
    println!("Subscribers: {}", video.subscriber_count);
    println!("Duration: {} s", video.duration);
    println!("Views: {}", video.view_count);
    println!("Likes: {}", video.like_count);
    println!("Published: {}", video.publish_date);
    println!("Thumbnail: {}", video.thumbnail);
}

fn print_captions(captions: &[CaptionEntry], max_captions: usize) {
    println!("Captions: {} entries", captions.len());

    for caption in captions.iter().take(max_captions) {
        println!(
            "  [{:>8} ms +{:>5}] {}",
            caption.start_offset_ms,
            caption.duration_ms,
            caption.text.replace('\n', " ")
        );
    }
}
