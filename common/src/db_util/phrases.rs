use super::*;
use crate::elo::DEFAULT_RATING;

table! {
    phrases (id) {
        id -> Integer,
        text -> Varchar,
        elo_rating -> Double,
        created_at -> Timestamptz,
    }
}

#[derive(Queryable)]
#[diesel(table_name = phrases)]
struct PhrasePrivate {
    id: i32,
    text: String,
    elo_rating: f64,
    created_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = phrases)]
struct PhrasePrivateNew {
    text: String,
    elo_rating: f64,
}

fn private_to_public(p: PhrasePrivate) -> Result<PhraseRecord> {
    use conversions::*;
    Ok(PhraseRecord {
        phrase_id: i32_to_u32(p.id)?,
        text: p.text,
        elo_rating: p.elo_rating,
        created_at: p.created_at,
    })
}

fn privates_to_publics(items: Vec<PhrasePrivate>) -> Result<Vec<PhraseRecord>> {
    items.into_iter().map(private_to_public).collect()
}

pub fn insert_phrase(conn: &mut PgConnection, input_text: &str) -> Result<PhraseRecord> {
    use self::phrases::dsl::*;

    let insert_row = PhrasePrivateNew {
        text: input_text.to_string(),
        elo_rating: DEFAULT_RATING,
    };

    let result = diesel::insert_into(phrases)
        .values(&insert_row)
        .get_result::<PhrasePrivate>(conn)?;
    private_to_public(result)
}

pub fn get_phrase_ids(conn: &mut PgConnection) -> Result<Vec<u32>> {
    use self::phrases::dsl::*;

    let row_ids: Vec<i32> = phrases.select(id).order(id.asc()).load(conn)?;
    row_ids.into_iter().map(conversions::i32_to_u32).collect()
}

pub fn get_phrases_by_ids(conn: &mut PgConnection, row_ids: &[u32]) -> Result<Vec<PhraseRecord>> {
    use self::phrases::dsl::*;

    let row_ids = conversions::u32s_to_i32s(row_ids)?;
    let items_private: Vec<PhrasePrivate> = phrases
        .filter(id.eq_any(row_ids))
        .order(id.asc())
        .load(conn)?;
    privates_to_publics(items_private)
}

pub fn get_phrases_ranked(conn: &mut PgConnection) -> Result<Vec<PhraseRecord>> {
    use self::phrases::dsl::*;

    let items_private: Vec<PhrasePrivate> = phrases
        .order((elo_rating.desc(), id.asc()))
        .load(conn)?;
    privates_to_publics(items_private)
}

/// Set a phrase's rating only if it still holds `previous_rating`.
/// Returns whether the row was updated.
pub fn update_phrase_rating_guarded(
    conn: &mut PgConnection,
    row_id: u32,
    previous_rating: f64,
    new_rating: f64,
) -> Result<bool> {
    use self::phrases::dsl::*;

    let input_id = row_id;
    let row_id = conversions::u32_to_i32(row_id)?;

    let updated = diesel::update(
        phrases
            .filter(id.eq(row_id))
            .filter(elo_rating.eq(previous_rating)),
    )
    .set(elo_rating.eq(new_rating))
    .execute(conn)
    .map_err(|err| guarded_write_error(err, input_id))?;
    Ok(updated == 1)
}
