use super::*;

table! {
    comparisons (id) {
        id -> Integer,
        phrase1_id -> Integer,
        phrase2_id -> Integer,
        winner_id -> Integer,
        created_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = comparisons)]
struct ComparisonPrivate {
    id: i32,
    phrase1_id: i32,
    phrase2_id: i32,
    winner_id: i32,
    created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = comparisons)]
struct ComparisonPrivateNew {
    phrase1_id: i32,
    phrase2_id: i32,
    winner_id: i32,
}

fn private_to_public(p: ComparisonPrivate) -> Result<ComparisonRecord> {
    use conversions::*;
    Ok(ComparisonRecord {
        comparison_id: i32_to_u32(p.id)?,
        phrase1_id: i32_to_u32(p.phrase1_id)?,
        phrase2_id: i32_to_u32(p.phrase2_id)?,
        winner_id: i32_to_u32(p.winner_id)?,
        created_at: p.created_at,
    })
}

fn build_new_row(comparison: &NewComparison) -> Result<ComparisonPrivateNew> {
    use conversions::*;
    Ok(ComparisonPrivateNew {
        phrase1_id: u32_to_i32(comparison.phrase1_id)?,
        phrase2_id: u32_to_i32(comparison.phrase2_id)?,
        winner_id: u32_to_i32(comparison.winner_id)?,
    })
}

pub fn insert_comparison(
    conn: &mut PgConnection,
    comparison: &NewComparison,
) -> Result<ComparisonRecord> {
    use self::comparisons::dsl::*;

    let insert_row = build_new_row(comparison)?;

    let result = diesel::insert_into(comparisons)
        .values(&insert_row)
        .get_result::<ComparisonPrivate>(conn)?;
    private_to_public(result)
}

/// Every comparison, oldest first.
pub fn get_all_comparisons(conn: &mut PgConnection) -> Result<Vec<ComparisonRecord>> {
    use self::comparisons::dsl::*;

    let items_private: Vec<ComparisonPrivate> = comparisons
        .order((created_at.asc(), id.asc()))
        .load(conn)?;

    items_private
        .into_iter()
        .map(private_to_public)
        .collect::<Result<Vec<ComparisonRecord>>>()
}
