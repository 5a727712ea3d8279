use std::path::PathBuf;

use sheetbind::{Converter, SheetRow};

#[derive(Debug, Default, SheetRow)]
#[sheet(name = "Movies Sheet")]
struct Movie {
    title: String,
    director: String,
    #[sheet(display = "Release Year")]
    release_year: i32,
    genre: String,
}

#[derive(Debug, Default, SheetRow)]
#[sheet(name = "People")]
struct Person {
    #[sheet(display = "Eye Colour")]
    eye_colour: String,
    age: Option<u32>,
    height: Option<f64>,
}

fn movie(title: &str, director: &str, release_year: i32, genre: &str) -> Movie {
    Movie {
        title: title.into(),
        director: director.into(),
        release_year,
        genre: genre.into(),
    }
}

fn sample_movies() -> Vec<Movie> {
    vec![
        movie("The Shawshank Redemption", "Frank Darabont", 1994, "Drama"),
        movie("The Godfather", "Francis Ford Coppola", 1972, "Crime"),
        movie("The Dark Knight", "Christopher Nolan", 2008, "Action"),
        movie("Pulp Fiction", "Quentin Tarantino", 1994, "Crime"),
        movie(
            "The Lord of the Rings: The Return of the King",
            "Peter Jackson",
            2003,
            "Fantasy",
        ),
        movie("Forrest Gump", "Robert Zemeckis", 1994, "Drama"),
        movie("Inception", "Christopher Nolan", 2010, "Sci-Fi"),
        movie("Fight Club", "David Fincher", 1999, "Drama"),
        movie("The Matrix", "Lana Wachowski, Lilly Wachowski", 1999, "Sci-Fi"),
        movie("Goodfellas", "Martin Scorsese", 1990, "Crime"),
    ]
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    let converter = Converter::new();

    let movies_path = dir.join("movie.xlsx");
    converter.write_sheet(&sample_movies(), &movies_path, "movie")?;
    for movie in converter.read_sheet::<Movie>(&movies_path, "movie")? {
        let json = serde_json::json!({
            "title": movie.title,
            "director": movie.director,
            "release_year": movie.release_year,
            "genre": movie.genre,
        });
        println!("{json}");
    }

    let people: Vec<Person> = (0..10u32)
        .map(|i| Person {
            eye_colour: ["Blue", "Green", "Brown", "Grey"][i as usize % 4].to_string(),
            age: Some(18 + i * 7),
            height: (i % 3 != 0).then(|| 150.0 + f64::from(i) * 4.5),
        })
        .collect();
    let people_path = dir.join("people.xlsx");
    converter.write(&people, &people_path)?;

    for person in converter.read::<Person>(&people_path)? {
        println!(
            "{} : {} : {}",
            person.eye_colour,
            person.age.map_or("-".to_string(), |a| a.to_string()),
            person.height.map_or("-".to_string(), |h| h.to_string()),
        );
    }
    Ok(())
}
