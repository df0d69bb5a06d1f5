use raml_core::{Document, NodePath, TypedNode, Visibility};

fn main() {
    let raml = r"#%RAML 0.8
title: Widget API
/widgets:
  description: Widget list. [Since:1.2]
  get:
    description: List widgets.
  /internal:
    description: Debug hooks. [Visibility:private]
    post:
";

    let mut doc = match Document::parse(raml) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Failed to parse RAML: {e:?}");
            return;
        }
    };

    let private: Vec<NodePath> = match doc.root().and_then(|root| root.all_descendants()) {
        Ok(resources) => resources
            .iter()
            .inspect(|r| println!("{} since {} ({})", r.uri(), r.since(), r.visibility()))
            .filter(|r| r.visibility() == Visibility::Private)
            .map(|r| r.path().clone())
            .collect(),
        Err(e) => {
            eprintln!("Failed to read resources: {e}");
            return;
        }
    };

    for path in &private {
        if let Err(e) = doc.drop_resource(path) {
            eprintln!("Failed to drop {path}: {e}");
        }
    }

    match doc.serialize() {
        Ok(text) => println!("Public API:\n{text}"),
        Err(e) => eprintln!("Failed to serialize: {e}"),
    }
}
