pub fn render_schema() -> String {
	expand_includes(include_str!("../../../sql/init.sql"))
}

fn expand_includes(sql: &str) -> String {
	let mut out = String::new();

	for line in sql.lines() {
		let trimmed = line.trim();

		if let Some(path) = trimmed.strip_prefix("\\ir ") {
			match path.trim() {
				"tables/001_projects.sql" =>
					out.push_str(include_str!("../../../sql/tables/001_projects.sql")),
				"tables/002_families.sql" =>
					out.push_str(include_str!("../../../sql/tables/002_families.sql")),
				"tables/003_saved_variants.sql" =>
					out.push_str(include_str!("../../../sql/tables/003_saved_variants.sql")),
				"tables/004_variant_tag_types.sql" =>
					out.push_str(include_str!("../../../sql/tables/004_variant_tag_types.sql")),
				"tables/005_variant_tags.sql" =>
					out.push_str(include_str!("../../../sql/tables/005_variant_tags.sql")),
				"tables/006_matchmaker_submissions.sql" => out
					.push_str(include_str!("../../../sql/tables/006_matchmaker_submissions.sql")),
				"tables/007_matchmaker_submission_genes.sql" => out.push_str(include_str!(
					"../../../sql/tables/007_matchmaker_submission_genes.sql"
				)),
				"tables/008_genes.sql" =>
					out.push_str(include_str!("../../../sql/tables/008_genes.sql")),
				"tables/009_search_results_cache.sql" =>
					out.push_str(include_str!("../../../sql/tables/009_search_results_cache.sql")),
				_ => out.push_str(line),
			}
		} else {
			out.push_str(line);
		}

		out.push('\n');
	}

	out
}
