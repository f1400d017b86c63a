use folio_common::doc::{
    DisplayMode, Document, GalleryAttrs, GridSpan, LinkMentionAttrs, Mark, MentionAttrs, Node,
};
use folio_renderer::{EmbedIndex, EmbedState, render_static};
use folio_resolve::{EmbedKey, EmbedKind, EmbedPayload, SocialPost, SocialUser};

fn render(content: Vec<Node>) -> String {
    render_static(&Document::new(content), &EmbedIndex::new())
}

#[test]
fn gallery_without_spans_uses_unit_spans() {
    let html = render(vec![
        Node::heading(1, vec![Node::text("Trip")]),
        Node::gallery(vec!["a.jpg".into(), "b.jpg".into()]),
    ]);
    insta::assert_snapshot!(html.trim_end(), @r#"
    <h1>Trip</h1>
    <div class="gallery gallery-grid"><div class="gallery-grid" style="grid-template-columns: repeat(3, 1fr)"><div class="gallery-grid-item" style="grid-column: span 1; grid-row: span 1"><img src="a.jpg" alt="Gallery image 1" class="gallery-image" loading="lazy" /></div><div class="gallery-grid-item" style="grid-column: span 1; grid-row: span 1"><img src="b.jpg" alt="Gallery image 2" class="gallery-image" loading="lazy" /></div></div></div>
    "#);
}

#[test]
fn paragraph_with_marks_and_link_mention() {
    let html = render(vec![
        Node::heading(1, vec![Node::text("Hello")]),
        Node::paragraph(vec![
            Node::text("Read "),
            Node::marked_text("this", vec![Mark::Bold, Mark::link("https://a.example?x=1&y=2")]),
            Node::text(" & "),
            Node::link_mention(LinkMentionAttrs {
                url: "https://example.com/post".into(),
                title: Some("Post".into()),
                hostname: Some("example.com".into()),
                ..Default::default()
            }),
        ]),
    ]);
    insta::assert_snapshot!(html.trim_end(), @r#"
    <h1>Hello</h1>
    <p>Read <a href="https://a.example?x=1&amp;y=2"><strong>this</strong></a> &amp; <span class="link-mention" data-type="link-mention" data-url="https://example.com/post" data-title="Post" data-hostname="example.com"><a href="https://example.com/post" target="_blank" rel="noopener noreferrer" class="link-mention-link"><span class="link-mention-content"><span class="link-mention-favicon link-mention-favicon-placeholder">E</span><span class="link-mention-title">Post</span></span></a></span></p>
    "#);
}

#[test]
fn gallery_modes_and_spans() {
    let list = render(vec![Node::Gallery(GalleryAttrs {
        images: vec!["a.jpg".into()],
        display_mode: DisplayMode::List,
        ..Default::default()
    })]);
    assert!(list.starts_with("<div class=\"gallery gallery-list\"><div class=\"gallery-list\"><div class=\"gallery-list-item\">"));

    let carousel = render(vec![Node::Gallery(GalleryAttrs {
        images: vec!["a.jpg".into(), "b.jpg".into(), "c.jpg".into()],
        display_mode: DisplayMode::Carousel,
        ..Default::default()
    })]);
    assert!(carousel.contains("aria-label=\"Previous image\""));
    assert!(carousel.contains("<div class=\"gallery-carousel-indicator\">1 / 3</div>"));

    let spanned = render(vec![Node::Gallery(GalleryAttrs {
        images: vec!["a.jpg".into(), "b.jpg".into()],
        columns: 2,
        grid_spans: vec![GridSpan { col: 2, row: 1 }],
        ..Default::default()
    })]);
    assert!(spanned.contains("repeat(2, 1fr)"));
    assert!(spanned.contains("grid-column: span 2; grid-row: span 1"));
    assert!(spanned.contains("grid-column: span 1; grid-row: span 1"));

    assert_eq!(render(vec![Node::gallery(vec![])]), "");
}

#[test]
fn mentions() {
    let html = render(vec![Node::paragraph(vec![Node::mention(MentionAttrs {
        id: "tw:jack".into(),
        label: Some("@tw:jack".into()),
        username: Some("jack".into()),
        display_name: Some("Jack".into()),
        verified: Some(true),
        ..Default::default()
    })])]);
    assert!(html.contains("class=\"mention mention-twitter\""));
    assert!(html.contains("data-label=\"@tw:jack\""));
    assert!(html.contains("href=\"https://twitter.com/jack\""));
    assert!(html.contains("<span class=\"mention-avatar mention-avatar-placeholder\">J</span>"));
    assert!(html.contains("<span class=\"mention-name\">Jack</span> <span class=\"mention-handle\">@jack</span>"));
    assert!(html.contains("class=\"mention-verified\""));
    assert!(html.contains("viewBox=\"0 0 24 24\""));

    // Verification badges are only shown for the twitter provider.
    let html = render(vec![Node::paragraph(vec![Node::mention(MentionAttrs {
        id: "gh:octocat".into(),
        username: Some("octocat".into()),
        avatar: Some("https://avatars.example/o.png".into()),
        verified: Some(true),
        ..Default::default()
    })])]);
    assert!(html.contains("class=\"mention mention-github\""));
    assert!(html.contains("data-label=\"gh:octocat\""));
    assert!(html.contains("<img class=\"mention-avatar\" src=\"https://avatars.example/o.png\" alt=\"@octocat\" />"));
    assert!(!html.contains("mention-verified"));

    let html = render(vec![Node::paragraph(vec![Node::mention(MentionAttrs {
        id: "someone".into(),
        ..Default::default()
    })])]);
    assert!(html.contains("class=\"mention mention-default\""));
    assert!(html.contains("href=\"#\""));
    assert!(!html.contains("mention-platform"));
}

#[test]
fn embeds_by_index_state() {
    let doc = Document::new(vec![
        Node::heading(1, vec![]),
        Node::twitter_embed("https://x.com/jack/status/20"),
        Node::twitter_embed("https://x.com/jack/status/21"),
        Node::twitter_embed("https://x.com/jack/status/22"),
        Node::twitter_embed("https://x.com/jack"),
        Node::youtube_embed("https://youtu.be/dQw4w9WgXcQ"),
        Node::youtube_embed("https://youtu.be/nope"),
    ]);
    let index: EmbedIndex = [
        (
            EmbedKey::new(EmbedKind::SocialPost, "20"),
            EmbedState::Ready(EmbedPayload::SocialPost(SocialPost {
                id_str: "20".into(),
                text: "just setting up my twttr".into(),
                user: SocialUser {
                    name: "jack".into(),
                    screen_name: "jack".into(),
                    ..Default::default()
                },
                ..Default::default()
            })),
        ),
        (EmbedKey::new(EmbedKind::SocialPost, "21"), EmbedState::NotFound),
    ]
    .into_iter()
    .collect();

    let html = render_static(&doc, &index);
    let lines: Vec<&str> = html.lines().collect();
    assert_eq!(lines.len(), 7);
    assert!(lines[1].contains("<p class=\"tweet-body\">just setting up my twttr</p>"));
    assert!(lines[1].contains("href=\"https://x.com/jack/status/20\""));
    assert!(lines[2].contains("Post not found"));
    assert!(lines[2].contains("href=\"https://x.com/jack/status/21\""));
    assert!(lines[3].contains("Loading\u{2026}"));
    assert!(lines[4].starts_with("<div class=\"twitter-embed twitter-embed-error\"><p>Invalid tweet URL</p>"));
    assert!(lines[5].contains("src=\"https://www.youtube.com/embed/dQw4w9WgXcQ\""));
    assert!(lines[5].contains("allowfullscreen=\"\""));
    assert!(lines[6].contains("Invalid YouTube URL"));
    assert!(lines[6].contains("View on YouTube"));
}

#[test]
fn blocks() {
    let doc: Document = serde_json::from_value(serde_json::json!({
        "type": "doc",
        "content": [
            {"type": "heading", "attrs": {"level": 1}, "content": [{"type": "text", "text": "T"}]},
            {"type": "orderedList", "attrs": {"start": 3}, "content": [
                {"type": "listItem", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "a"}]}]}
            ]},
            {"type": "table", "content": [
                {"type": "tableRow", "content": [
                    {"type": "tableHeader", "attrs": {"colspan": 2}, "content": [{"type": "paragraph"}]},
                    {"type": "tableCell", "content": [{"type": "paragraph", "content": [{"type": "text", "text": "c"}]}]}
                ]}
            ]},
            {"type": "image", "attrs": {"src": "x.png"}},
            {"type": "horizontalRule"}
        ]
    }))
    .unwrap();
    let html = render_static(&doc, &EmbedIndex::new());
    insta::assert_snapshot!(html.trim_end(), @r#"
    <h1>T</h1>
    <ol start="3"><li><p>a</p></li></ol>
    <table><tbody><tr><th colspan="2"><p></p></th><td><p>c</p></td></tr></tbody></table>
    <img src="x.png" alt="" />
    <hr />
    "#);
}
