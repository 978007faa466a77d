use bookstore_order_api::{config::AppConfig, db::create_pool};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_books(&pool).await?;
    seed_stock(&pool).await?;

    println!("Seed completed");
    Ok(())
}

async fn seed_books(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let books = vec![
        ("9780134685991", "Effective Java", "Joshua Bloch", 45000_i64),
        ("9781593278281", "The Rust Programming Language", "Steve Klabnik", 38000),
        ("9780135957059", "The Pragmatic Programmer", "David Thomas", 42000),
        ("9791162241776", "Clean Architecture", "Robert C. Martin", 16000),
    ];

    for (isbn, title, author, price) in books {
        sqlx::query(
            r#"
            INSERT INTO books (isbn, title, author, price)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (isbn) DO NOTHING
            "#,
        )
        .bind(isbn)
        .bind(title)
        .bind(author)
        .bind(price)
        .execute(pool)
        .await?;
    }

    println!("Seeded books");
    Ok(())
}

/// Give every seeded book an opening inbound entry so the ledger starts
/// from a known level. Skips books that already have history.
async fn seed_stock(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let isbns: Vec<(String,)> = sqlx::query_as(
        r#"
        SELECT b.isbn FROM books b
        WHERE NOT EXISTS (SELECT 1 FROM stock_entries s WHERE s.isbn = b.isbn)
        "#,
    )
    .fetch_all(pool)
    .await?;

    for (isbn,) in isbns {
        sqlx::query(
            r#"
            INSERT INTO stock_entries (isbn, direction, quantity, quantity_before, quantity_after)
            VALUES ($1, 'INBOUND', $2, 0, $2)
            "#,
        )
        .bind(&isbn)
        .bind(100_i32)
        .execute(pool)
        .await?;
        println!("Seeded opening stock for {isbn}");
    }

    println!("Seeded stock");
    Ok(())
}
