//! PDF fixtures built in memory with lopdf

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};

const RADIO: i64 = 1 << 15;
const PUSHBUTTON: i64 = 1 << 16;
const COMBO: i64 = 1 << 17;
const MULTI_SELECT: i64 = 1 << 21;

fn appearance(doc: &mut Document, on: &str) -> Object {
    let on_stream = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let off_stream = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));
    let mut normal = Dictionary::new();
    normal.set(on, Object::Reference(on_stream));
    normal.set("Off", Object::Reference(off_stream));
    Object::Dictionary(dictionary! { "N" => normal })
}

fn finish(mut doc: Document, fields: Option<Vec<ObjectId>>) -> Vec<u8> {
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => Object::Reference(pages_id),
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1,
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => Object::Reference(pages_id),
    };
    if let Some(fields) = fields {
        let acroform = doc.add_object(dictionary! {
            "Fields" => fields.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        });
        catalog.set("AcroForm", Object::Reference(acroform));
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("fixture serializes");
    buffer
}

/// A form with one field of every kind:
///
/// | # | name         | kind              | value  |
/// |---|--------------|-------------------|--------|
/// | 0 | Name         | text              | Alice  |
/// | 1 | Agree        | checkbox          | off    |
/// | 2 | Color        | radio group       | Green  |
/// | 3 | Country      | dropdown          | US     |
/// | 4 | Toppings     | multi-select list | Cheese |
/// | 5 | Submit       | button            |        |
/// | 6 | Signature    | unknown           |        |
/// | 7 | address.city | text              | Paris  |
pub fn sample_form() -> Vec<u8> {
    let mut doc = Document::with_version("1.7");

    let name = doc.add_object(dictionary! {
        "FT" => "Tx",
        "T" => Object::string_literal("Name"),
        "V" => Object::string_literal("Alice"),
    });

    let agree_ap = appearance(&mut doc, "Yes");
    let agree = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("Agree"),
        "V" => "Off",
        "AS" => "Off",
        "AP" => agree_ap,
    });

    let color = doc.new_object_id();
    let mut widgets = Vec::new();
    for option in ["Red", "Green", "Blue"] {
        let ap = appearance(&mut doc, option);
        let state = if option == "Green" { option } else { "Off" };
        widgets.push(Object::Reference(doc.add_object(dictionary! {
            "Type" => "Annot",
            "Subtype" => "Widget",
            "Parent" => Object::Reference(color),
            "AS" => state,
            "AP" => ap,
        })));
    }
    doc.objects.insert(
        color,
        Object::Dictionary(dictionary! {
            "FT" => "Btn",
            "Ff" => RADIO,
            "T" => Object::string_literal("Color"),
            "V" => "Green",
            "Kids" => widgets,
        }),
    );

    let country = doc.add_object(dictionary! {
        "FT" => "Ch",
        "Ff" => COMBO,
        "T" => Object::string_literal("Country"),
        "Opt" => vec![
            Object::string_literal("US"),
            Object::string_literal("FR"),
            Object::string_literal("JP"),
        ],
        "V" => Object::string_literal("US"),
    });

    let toppings = doc.add_object(dictionary! {
        "FT" => "Ch",
        "Ff" => MULTI_SELECT,
        "T" => Object::string_literal("Toppings"),
        "Opt" => vec![Object::string_literal("Cheese"), Object::string_literal("Ham")],
        "V" => Object::string_literal("Cheese"),
    });

    let submit = doc.add_object(dictionary! {
        "FT" => "Btn",
        "Ff" => PUSHBUTTON,
        "T" => Object::string_literal("Submit"),
    });

    let signature = doc.add_object(dictionary! {
        "FT" => "Sig",
        "T" => Object::string_literal("Signature"),
    });

    let address = doc.new_object_id();
    let city = doc.add_object(dictionary! {
        "T" => Object::string_literal("city"),
        "Parent" => Object::Reference(address),
        "V" => Object::string_literal("Paris"),
    });
    doc.objects.insert(
        address,
        Object::Dictionary(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("address"),
            "Kids" => vec![Object::Reference(city)],
        }),
    );

    finish(
        doc,
        Some(vec![
            name, agree, color, country, toppings, submit, signature, address,
        ]),
    )
}

/// A valid one-page PDF without an AcroForm
#[allow(dead_code)]
pub fn plain_pdf() -> Vec<u8> {
    finish(Document::with_version("1.7"), None)
}
