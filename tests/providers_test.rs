use image_curator::providers::flickr::{parse_search_html, to_hi_res_url};
use image_curator::providers::unsplash::{extension_from_format_param, strip_tracking_token};
use image_curator::providers::{
    PexelsPhoto, PexelsProvider, PixabayImage, PixabayProvider, UnsplashPhoto, UnsplashProvider,
};
use image_curator::utils::{extension_from_url, term_to_folder_name};
use image_curator::{CandidateImage, CuratorConfig, ImageProvider, ImageStatus, ProviderKind};

fn config() -> CuratorConfig {
    CuratorConfig::default().with_project_name("test_project")
}

// Pexels

fn pexels_photo() -> PexelsPhoto {
    serde_json::from_str(
        r#"{
            "id": 123,
            "width": 4000,
            "height": 3000,
            "url": "https://www.pexels.com/photo/123/",
            "photographer": "Sample Person",
            "src": {
                "original": "https://images.pexels.com/photos/123/photo.jpeg",
                "large2x": "https://images.pexels.com/photos/123/photo.jpeg?w=1880",
                "large": "https://images.pexels.com/photos/123/photo.jpeg?w=940",
                "medium": "",
                "small": "https://images.pexels.com/photos/123/photo.jpeg?w=130",
                "tiny": "https://images.pexels.com/photos/123/photo.jpeg?w=80"
            }
        }"#,
    )
    .expect("pexels payload")
}

#[test]
fn pexels_variants_keep_preference_order_and_skip_blanks() {
    let provider = PexelsProvider::new(None, "https://api.pexels.com/v1".into(), &config());
    let candidate = CandidateImage::Pexels(pexels_photo());

    let variants = provider.variant_urls(&candidate);

    assert_eq!(variants.len(), 4, "empty medium is dropped");
    assert_eq!(variants[0], "https://images.pexels.com/photos/123/photo.jpeg");
    assert!(variants[1].contains("w=1880"));
    assert!(variants[3].contains("w=130"));
}

#[test]
fn pexels_record_maps_page_thumbnail_and_extension() {
    let provider = PexelsProvider::new(None, "https://api.pexels.com/v1".into(), &config());
    let candidate = CandidateImage::Pexels(pexels_photo());

    let record = provider.record_for(&candidate, 5);

    assert_eq!(record.source_id, "123");
    assert_eq!(record.source_api, ProviderKind::Pexels);
    assert_eq!(
        record.url_original.as_deref(),
        Some("https://images.pexels.com/photos/123/photo.jpeg")
    );
    assert!(record.url_thumbnail.as_deref().unwrap().contains("w=80"));
    assert_eq!(
        record.url_page.as_deref(),
        Some("https://www.pexels.com/photo/123/")
    );
    assert_eq!(record.extension.as_deref(), Some("jpeg"));
    assert_eq!(record.status, ImageStatus::Approved);
    assert_eq!(record.term_id, 5);
}

#[test]
fn pexels_display_url_prefers_large2x() {
    let candidate = CandidateImage::Pexels(pexels_photo());
    assert!(candidate.display_url().unwrap().contains("w=1880"));

    let mut no_large2x = pexels_photo();
    no_large2x.src.large2x.clear();
    let candidate = CandidateImage::Pexels(no_large2x);
    assert_eq!(
        candidate.display_url().as_deref(),
        Some("https://images.pexels.com/photos/123/photo.jpeg")
    );
}

// Pixabay

fn pixabay_image() -> PixabayImage {
    serde_json::from_str(
        r#"{
            "id": 195893,
            "pageURL": "https://pixabay.com/photos/blossom-195893/",
            "type": "photo",
            "tags": "blossom, bloom, flower",
            "previewURL": "https://cdn.pixabay.com/photo/blossom_150.jpg",
            "webformatURL": "https://pixabay.com/get/blossom_640.jpg",
            "largeImageURL": "https://pixabay.com/get/blossom_1280.jpg",
            "imageWidth": 4000,
            "imageHeight": 2250,
            "imageSize": 4731420,
            "views": 7671,
            "downloads": 6439,
            "user": "Josch13"
        }"#,
    )
    .expect("pixabay payload")
}

#[test]
fn pixabay_payload_maps_the_renamed_fields() {
    let image = pixabay_image();

    assert_eq!(image.id, 195893);
    assert_eq!(image.page_url, "https://pixabay.com/photos/blossom-195893/");
    assert_eq!(image.image_type, "photo");
    assert_eq!(image.webformat_url, "https://pixabay.com/get/blossom_640.jpg");
    assert_eq!(image.large_image_url, "https://pixabay.com/get/blossom_1280.jpg");
    assert_eq!(image.image_size, 4731420);
}

#[test]
fn pixabay_has_a_single_download_variant() {
    let provider = PixabayProvider::new(None, "https://pixabay.com/api/".into(), &config());
    let candidate = CandidateImage::Pixabay(pixabay_image());

    assert_eq!(
        provider.variant_urls(&candidate),
        vec!["https://pixabay.com/get/blossom_1280.jpg".to_string()]
    );

    let empty = CandidateImage::Pixabay(PixabayImage::default());
    assert!(provider.variant_urls(&empty).is_empty());
    assert!(empty.display_url().is_none());
}

#[test]
fn pixabay_record_uses_webformat_as_thumbnail() {
    let provider = PixabayProvider::new(None, "https://pixabay.com/api/".into(), &config());
    let candidate = CandidateImage::Pixabay(pixabay_image());

    let record = provider.record_for(&candidate, 1);

    assert_eq!(record.source_id, "195893");
    assert_eq!(
        record.url_original.as_deref(),
        Some("https://pixabay.com/get/blossom_1280.jpg")
    );
    assert_eq!(
        record.url_thumbnail.as_deref(),
        Some("https://pixabay.com/get/blossom_640.jpg")
    );
    assert_eq!(
        record.url_page.as_deref(),
        Some("https://pixabay.com/photos/blossom-195893/")
    );
    assert_eq!(record.extension.as_deref(), Some("jpg"));
}

// Unsplash

fn unsplash_photo() -> UnsplashPhoto {
    serde_json::from_str(
        r#"{
            "id": "Dwu85P9SOIk",
            "width": 2448,
            "height": 3264,
            "description": "A man drinking a coffee.",
            "urls": {
                "raw": "https://images.unsplash.com/photo-1?ixid=abc123",
                "full": "https://images.unsplash.com/photo-1?fm=png&ixid=abc123",
                "regular": "https://images.unsplash.com/photo-1?w=1080&ixid=abc123",
                "small": "https://images.unsplash.com/photo-1?w=400&ixid=abc123",
                "thumb": "https://images.unsplash.com/photo-1?w=200&ixid=abc123"
            },
            "links": {
                "self": "https://api.unsplash.com/photos/Dwu85P9SOIk",
                "html": "https://unsplash.com/photos/Dwu85P9SOIk",
                "download": "https://unsplash.com/photos/Dwu85P9SOIk/download"
            },
            "user": {
                "id": "QPxL2MGqfrw",
                "username": "exampleuser",
                "name": "Joe Example"
            }
        }"#,
    )
    .expect("unsplash payload")
}

#[test]
fn tracking_token_is_stripped_in_both_positions() {
    assert_eq!(
        strip_tracking_token("https://images.unsplash.com/photo-1?ixid=abc123"),
        "https://images.unsplash.com/photo-1"
    );
    assert_eq!(
        strip_tracking_token("https://images.unsplash.com/photo-1?w=1080&ixid=abc123"),
        "https://images.unsplash.com/photo-1?w=1080"
    );
    assert_eq!(
        strip_tracking_token("https://images.unsplash.com/photo-1?w=1080"),
        "https://images.unsplash.com/photo-1?w=1080"
    );
}

#[test]
fn format_param_drives_the_extension() {
    assert_eq!(
        extension_from_format_param("https://images.unsplash.com/photo-1?fm=png&w=200"),
        "png"
    );
    assert_eq!(
        extension_from_format_param("https://images.unsplash.com/photo-1?w=200"),
        "jpg"
    );
    assert_eq!(extension_from_format_param("not a url"), "jpg");
}

#[test]
fn unsplash_variants_are_stripped_and_ordered() {
    let provider = UnsplashProvider::new(None, "https://api.unsplash.com".into(), &config());
    let candidate = CandidateImage::Unsplash(unsplash_photo());

    let variants = provider.variant_urls(&candidate);

    assert_eq!(
        variants,
        vec![
            "https://images.unsplash.com/photo-1?fm=png".to_string(),
            "https://images.unsplash.com/photo-1?w=1080".to_string(),
            "https://images.unsplash.com/photo-1?w=400".to_string(),
        ]
    );
    assert_eq!(provider.extension_for(&variants[0]), "png");
}

#[test]
fn unsplash_record_points_at_the_download_link() {
    let provider = UnsplashProvider::new(None, "https://api.unsplash.com".into(), &config());
    let candidate = CandidateImage::Unsplash(unsplash_photo());

    let record = provider.record_for(&candidate, 2);

    assert_eq!(record.source_id, "Dwu85P9SOIk");
    assert_eq!(
        record.url_original.as_deref(),
        Some("https://unsplash.com/photos/Dwu85P9SOIk/download")
    );
    assert_eq!(record.url_original, record.url_thumbnail);
    assert_eq!(
        record.url_page.as_deref(),
        Some("https://unsplash.com/photos/Dwu85P9SOIk")
    );
    assert_eq!(record.extension.as_deref(), Some("png"));
}

#[test]
fn unsplash_display_url_is_the_stripped_full_variant() {
    let candidate = CandidateImage::Unsplash(unsplash_photo());
    assert_eq!(
        candidate.display_url().as_deref(),
        Some("https://images.unsplash.com/photo-1?fm=png")
    );
}

// Flickr

#[test]
fn size_suffix_is_rewritten_to_the_large_variant() {
    assert_eq!(
        to_hi_res_url("https://live.staticflickr.com/65535/52001_a1b2c3_m.jpg"),
        "https://live.staticflickr.com/65535/52001_a1b2c3_b.jpg"
    );
    // Already large, unchanged in effect.
    assert_eq!(
        to_hi_res_url("https://live.staticflickr.com/65535/52001_a1b2c3_b.jpg"),
        "https://live.staticflickr.com/65535/52001_a1b2c3_b.jpg"
    );
    // No size suffix to rewrite.
    assert_eq!(
        to_hi_res_url("https://live.staticflickr.com/65535/photo.jpg"),
        "https://live.staticflickr.com/65535/photo.jpg"
    );
    assert_eq!(
        to_hi_res_url("https://live.staticflickr.com/65535/photo.png"),
        "https://live.staticflickr.com/65535/photo.png"
    );
}

#[test]
fn search_page_scrape_dedupes_and_respects_the_limit() {
    let html = r#"
        <html><body>
            <img src="//live.staticflickr.com/65535/111_aaa_m.jpg">
            <img src="https://live.staticflickr.com/65535/111_aaa_t.jpg">
            <img src="https://example.com/banner.jpg">
            <img src="https://live.staticflickr.com/65535/222_bbb_m.jpg">
            <img src="https://live.staticflickr.com/65535/333_ccc_m.jpg">
        </body></html>
    "#;

    let photos = parse_search_html(html, 2);

    assert_eq!(photos.len(), 2, "limit applies after dedupe");
    assert_eq!(photos[0].id, "111");
    assert_eq!(
        photos[0].url,
        "https://live.staticflickr.com/65535/111_aaa_m.jpg",
        "protocol-relative src is normalized"
    );
    assert_eq!(
        photos[0].hi_res_url,
        "https://live.staticflickr.com/65535/111_aaa_b.jpg"
    );
    assert_eq!(photos[1].id, "222");
}

#[test]
fn scrape_of_a_page_without_thumbnails_is_empty() {
    let html = "<html><body><p>No photos here.</p></body></html>";
    assert!(parse_search_html(html, 30).is_empty());
}

// Shared helpers

#[test]
fn provider_keys_parse_case_insensitively() {
    assert_eq!("pexels".parse::<ProviderKind>().unwrap(), ProviderKind::Pexels);
    assert_eq!("Flickr".parse::<ProviderKind>().unwrap(), ProviderKind::Flickr);
    assert_eq!("UNSPLASH".parse::<ProviderKind>().unwrap(), ProviderKind::Unsplash);
    assert!("imgur".parse::<ProviderKind>().is_err());
}

#[test]
fn term_folder_names_are_lowercased_with_underscores() {
    assert_eq!(term_to_folder_name("Golden Retriever"), "golden_retriever");
    assert_eq!(term_to_folder_name("cat"), "cat");
}

#[test]
fn url_extensions_fall_back_to_jpg() {
    assert_eq!(extension_from_url("https://a.example/photo.png?x=1"), "png");
    assert_eq!(extension_from_url("https://a.example/photo.jpeg#frag"), "jpeg");
    assert_eq!(extension_from_url("https://a.example/photo"), "jpg");
    assert_eq!(extension_from_url("https://a.example/archive.backup"), "jpg");
}
