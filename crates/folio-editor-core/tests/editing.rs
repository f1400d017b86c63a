use std::sync::{Arc, Mutex};

use folio_common::doc::{Document, GalleryAttrs, Mark, Node};
use folio_common::schema;
use folio_editor_core::{
    ChangeOrigin, EditError, EditOp, LinkChoice, PasteOutcome, PostEditor, UndoManager,
};
use folio_resolve::{
    EmbedKind, Identity, LinkMetadata, LinkPasteSuggestion, Provider, SuggestionItem,
};

fn editor_with_body(body: &str) -> PostEditor {
    PostEditor::new(Document::new(vec![
        Node::heading(1, vec![Node::text("Title")]),
        Node::paragraph(vec![Node::text(body)]),
    ]))
}

#[test]
fn social_post_paste_becomes_an_embed() {
    // <h1>Title</h1> <p>ab</p>: "a|b" is position 9
    let mut editor = editor_with_body("ab");
    let outcome = editor
        .paste_text(9, "https://example.com/status/12345")
        .unwrap();
    assert_eq!(
        outcome,
        PasteOutcome::Embedded {
            kind: EmbedKind::SocialPost,
            id: "12345".into(),
            cursor: 11,
        }
    );
    assert_eq!(
        editor.document().content,
        vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![Node::text("a")]),
            Node::twitter_embed("https://example.com/status/12345"),
            Node::paragraph(vec![Node::text("b")]),
        ]
    );
}

#[test]
fn video_paste_wins_over_link_mention() {
    let mut editor = editor_with_body("");
    let outcome = editor
        .paste_text(9, "https://www.youtube.com/watch?v=dQw4w9WgXcQ")
        .unwrap();
    assert!(matches!(
        outcome,
        PasteOutcome::Embedded {
            kind: EmbedKind::Video,
            ..
        }
    ));
    assert!(matches!(editor.document().content[2], Node::YoutubeEmbed(_)));
}

#[test]
fn link_paste_waits_for_a_choice() {
    let mut editor = editor_with_body("see ");
    let version = editor.version();
    let PasteOutcome::PendingLink(pending) = editor
        .paste_text(12, "https://example.com/post")
        .unwrap()
    else {
        panic!("expected a pending link paste");
    };
    assert_eq!(editor.version(), version);

    let suggestion = LinkPasteSuggestion {
        url: pending.url.clone(),
        metadata: LinkMetadata {
            url: pending.url.to_string(),
            title: Some("A post".into()),
            favicon: None,
            hostname: "example.com".into(),
        },
    };

    let mut as_link = editor_with_body("see ");
    as_link
        .complete_link_paste(&pending, &suggestion, LinkChoice::PlainLink)
        .unwrap();
    assert_eq!(
        as_link.document().content[1].content(),
        &[
            Node::text("see "),
            Node::marked_text(
                "https://example.com/post",
                vec![Mark::link("https://example.com/post")]
            ),
        ]
    );

    let cursor = editor
        .complete_link_paste(&pending, &suggestion, LinkChoice::Mention)
        .unwrap();
    assert_eq!(cursor, 13);
    let Node::LinkMention(attrs) = &editor.document().content[1].content()[1] else {
        panic!("expected a link mention");
    };
    assert_eq!(attrs.title.as_deref(), Some("A post"));
    assert_eq!(attrs.hostname.as_deref(), Some("example.com"));
}

#[test]
fn plain_paste_inserts_text() {
    let mut editor = editor_with_body("ab");
    assert_eq!(
        editor.paste_text(9, "hello there").unwrap(),
        PasteOutcome::Text { cursor: 20 }
    );
    assert_eq!(editor.document().content[1].text_content(), "ahello thereb");
    assert_eq!(
        editor.paste_text(99, "x"),
        Err(EditError::OutOfRange { pos: 99, size: 22 })
    );
}

#[test]
fn empty_paste_between_blocks_changes_nothing() {
    let mut editor = editor_with_body("ab");
    let before = editor.document().clone();
    assert_eq!(
        editor.paste_text(7, "").unwrap(),
        PasteOutcome::Text { cursor: 7 }
    );
    assert_eq!(editor.document(), &before);
    assert_eq!(editor.version(), 0);
    assert!(!editor.can_undo());
}

#[test]
fn mention_suggestions_replace_the_trigger() {
    // <h1>Title</h1> <p>hi @tw:jack</p>; the trigger spans 11..19
    let mut editor = editor_with_body("hi @tw:jack");
    let mut identity = Identity::new(Provider::Twitter, "jack");
    identity.display_name = Some("Jack".into());
    let item = SuggestionItem::Identity(identity);

    let cursor = editor.apply_mention(11..19, item.on_select()).unwrap();
    assert_eq!(cursor, 12);
    let paragraph = editor.document().content[1].content();
    assert_eq!(paragraph[0], Node::text("hi "));
    let Node::Mention(attrs) = &paragraph[1] else {
        panic!("expected a mention node");
    };
    assert_eq!(attrs.id, "tw:jack");
    assert_eq!(attrs.display_name.as_deref(), Some("Jack"));

    // Hints only put the provider prefix back as text.
    let mut editor = editor_with_body("@t");
    editor
        .apply_mention(8..10, SuggestionItem::Hint(Provider::Twitter).on_select())
        .unwrap();
    assert_eq!(editor.document().content[1].text_content(), "@tw:");
    assert_eq!(editor.document().content[1].content().len(), 1);
}

#[test]
fn deleting_into_a_gallery_removes_it_whole() {
    // <h1>Title</h1> <p>abc</p> <gallery> <p>z</p>
    let gallery = Node::Gallery(GalleryAttrs {
        images: vec!["a.png".into(), "b.png".into()],
        columns: 2,
        ..Default::default()
    });
    let mut editor = PostEditor::new(Document::new(vec![
        Node::heading(1, vec![Node::text("Title")]),
        Node::paragraph(vec![Node::text("abc")]),
        gallery,
        Node::paragraph(vec![Node::text("z")]),
    ]));

    let range = editor.select_node_at(12).unwrap();
    assert_eq!(range, 12..13);

    editor.apply_edit(EditOp::Delete { from: 9, to: 13 }).unwrap();
    assert_eq!(
        editor.document().content,
        vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::paragraph(vec![Node::text("a")]),
            Node::paragraph(vec![Node::text("z")]),
        ]
    );
    assert!(!editor.document().content.iter().any(|n| matches!(n, Node::Gallery(_))));
}

#[test]
fn every_notified_document_keeps_its_title() {
    let mut editor = editor_with_body("body");
    let origins = Arc::new(Mutex::new(Vec::new()));
    let sink = origins.clone();
    editor.on_change(move |doc, change| {
        assert!(schema::validate(doc));
        sink.lock().unwrap().push(change.origin);
    });

    // Select everything and delete it.
    let end = editor.document().content_size();
    editor.apply_edit(EditOp::Delete { from: 0, to: end }).unwrap();
    assert_eq!(editor.document(), &Document::with_empty_title());

    editor
        .apply_edit(EditOp::InsertNode {
            pos: 0,
            node: Node::gallery(vec!["a.png".into()]),
        })
        .unwrap();
    assert!(schema::validate(editor.document()));
    assert!(matches!(editor.document().content[1], Node::Gallery(_)));

    assert!(editor.undo());
    editor.set_content(Document::new(vec![Node::paragraph(vec![Node::text("x")])]));
    assert_eq!(editor.document().content[0], Node::heading(1, vec![Node::text("x")]));

    assert_eq!(
        *origins.lock().unwrap(),
        vec![
            ChangeOrigin::Edit,
            ChangeOrigin::Edit,
            ChangeOrigin::Undo,
            ChangeOrigin::Reset,
        ]
    );
}
