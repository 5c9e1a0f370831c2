mod common;

use upside_down::scorer::Bm25Scorer;

#[test]
fn rarer_terms_score_higher_across_real_postings() {
    let index = common::simple_index();
    index.update(b"1".to_vec(), vec![common::text("title", "the cat sat")]).unwrap();
    index.update(b"2".to_vec(), vec![common::text("title", "the dog sat")]).unwrap();
    index.update(b"3".to_vec(), vec![common::text("title", "the bird sat")]).unwrap();

    let reader = index.reader();
    let field_id = reader.field_id("title").unwrap().unwrap();
    let total_docs = reader.doc_count().unwrap();

    let mut common_reader = reader.term_field_reader(field_id, b"the").unwrap();
    let common_doc_freq = common_reader.count();
    let common_doc = common_reader.next().unwrap().unwrap();

    let mut rare_reader = reader.term_field_reader(field_id, b"cat").unwrap();
    let rare_doc_freq = rare_reader.count();
    let rare_doc = rare_reader.next().unwrap().unwrap();

    let scorer = Bm25Scorer::new(total_docs, 3.0);
    let common_match = scorer.score_term(&common_doc, common_doc_freq, 3.0, false);
    let rare_match = scorer.score_term(&rare_doc, rare_doc_freq, 3.0, false);

    assert!(rare_match.score > common_match.score);
}

#[test]
fn explanation_tree_carries_idf_and_tf_children() {
    let index = common::simple_index();
    index.update(b"1".to_vec(), vec![common::text("title", "quick quick fox")]).unwrap();

    let reader = index.reader();
    let field_id = reader.field_id("title").unwrap().unwrap();
    let mut postings = reader.term_field_reader(field_id, b"quick").unwrap();
    let doc_freq = postings.count();
    let doc = postings.next().unwrap().unwrap();
    assert_eq!(doc.freq, 2);

    let scorer = Bm25Scorer::new(reader.doc_count().unwrap(), 3.0);
    let result = scorer.score_term(&doc, doc_freq, 3.0, true);
    let explanation = result.explanation.unwrap();
    assert_eq!(explanation.children.len(), 2);
    assert!((explanation.value - result.score).abs() < f32::EPSILON);
}
