use std::collections::HashMap;

use qdrant_client::qdrant::{Value, value::Kind};

use savor_domain::{RecipeMeta, RecipeStep};

pub const RECIPE_ID_KEY: &str = "recipe_id";
pub const CATEGORY_KEY: &str = "category";

pub type Payload = HashMap<String, Value>;

pub fn payload_string(payload: &Payload, key: &str) -> Option<String> {
	value_string(payload.get(key)?)
}

/// A list of strings. Non-string entries are skipped; a bare string is a one-item list.
pub fn payload_string_list(payload: &Payload, key: &str) -> Option<Vec<String>> {
	match &payload.get(key)?.kind {
		Some(Kind::ListValue(list)) => Some(list.values.iter().filter_map(value_string).collect()),
		Some(Kind::StringValue(text)) => Some(vec![text.to_string()]),
		_ => None,
	}
}

pub fn payload_steps(payload: &Payload, key: &str) -> Option<Vec<RecipeStep>> {
	let Some(Kind::ListValue(list)) = &payload.get(key)?.kind else {
		return None;
	};
	let steps = list
		.values
		.iter()
		.filter_map(|value| match &value.kind {
			Some(Kind::StringValue(text)) => Some(RecipeStep { text: text.to_string(), images: Vec::new() }),
			Some(Kind::StructValue(step)) => Some(RecipeStep {
				text: payload_string(&step.fields, "text")?,
				images: payload_string_list(&step.fields, "images").unwrap_or_default(),
			}),
			_ => None,
		})
		.collect();

	Some(steps)
}

pub fn recipe_meta(payload: &Payload) -> RecipeMeta {
	RecipeMeta {
		title: payload_string(payload, "title"),
		image: payload_string(payload, "image"),
		ingredients: payload_string_list(payload, "ingredients"),
		steps: payload_steps(payload, "steps"),
	}
}

fn value_string(value: &Value) -> Option<String> {
	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		Some(Kind::IntegerValue(number)) => Some(number.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use qdrant_client::qdrant::{ListValue, Struct};

	use super::*;

	fn text(value: &str) -> Value {
		Value { kind: Some(Kind::StringValue(value.to_string())) }
	}

	fn list(values: Vec<Value>) -> Value {
		Value { kind: Some(Kind::ListValue(ListValue { values })) }
	}

	fn object(fields: Vec<(&str, Value)>) -> Value {
		let fields = fields.into_iter().map(|(key, value)| (key.to_string(), value)).collect();

		Value { kind: Some(Kind::StructValue(Struct { fields })) }
	}

	#[test]
	fn parses_full_recipe_payload() {
		let payload: Payload = [
			("title".to_string(), text("Ayam Bakar")),
			("image".to_string(), text("https://img.example/ayam.jpg")),
			("ingredients".to_string(), list(vec![text("ayam"), text("kecap")])),
			(
				"steps".to_string(),
				list(vec![
					object(vec![("text", text("Marinate.")), ("images", list(vec![text("s1.jpg")]))]),
					text("Grill."),
				]),
			),
		]
		.into_iter()
		.collect();
		let meta = recipe_meta(&payload);

		assert_eq!(meta.title.as_deref(), Some("Ayam Bakar"));
		assert_eq!(meta.ingredients, Some(vec!["ayam".to_string(), "kecap".to_string()]));

		let steps = meta.steps.expect("Steps must parse.");

		assert_eq!(steps.len(), 2);
		assert_eq!(steps[0].images, vec!["s1.jpg".to_string()]);
		assert_eq!(steps[1].text, "Grill.");
	}

	#[test]
	fn mistyped_fields_are_absent() {
		let payload: Payload = [
			("title".to_string(), Value { kind: Some(Kind::BoolValue(true)) }),
			("steps".to_string(), text("not a list")),
			("ingredients".to_string(), list(vec![text("tempe"), Value { kind: None }])),
		]
		.into_iter()
		.collect();
		let meta = recipe_meta(&payload);

		assert_eq!(meta.title, None);
		assert_eq!(meta.image, None);
		assert_eq!(meta.steps, None);
		assert_eq!(meta.ingredients, Some(vec!["tempe".to_string()]));
	}

	#[test]
	fn numeric_recipe_ids_are_read_as_strings() {
		let payload: Payload =
			[(RECIPE_ID_KEY.to_string(), Value { kind: Some(Kind::IntegerValue(42)) })]
				.into_iter()
				.collect();

		assert_eq!(payload_string(&payload, RECIPE_ID_KEY).as_deref(), Some("42"));
	}
}
