pub const CURRENT_SCHEMA: &str = r#"
PRAGMA user_version = 1;

CREATE TABLE categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE subcategories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    category_id INTEGER NOT NULL,
    FOREIGN KEY (category_id) REFERENCES categories (id) ON DELETE CASCADE
);

CREATE TABLE technologies (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    subcategory_id INTEGER,
    FOREIGN KEY (subcategory_id) REFERENCES subcategories (id) ON DELETE CASCADE
);

CREATE TABLE projects (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    github TEXT NOT NULL
);

CREATE TABLE project_technologies (
    project_id INTEGER NOT NULL,
    technology_id INTEGER NOT NULL,
    PRIMARY KEY (project_id, technology_id),
    FOREIGN KEY (project_id) REFERENCES projects (id) ON DELETE CASCADE,
    FOREIGN KEY (technology_id) REFERENCES technologies (id) ON DELETE CASCADE
);

CREATE TABLE jobs (
    id INTEGER PRIMARY KEY,
    company TEXT NOT NULL,
    link TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE,
    is_current BOOLEAN NOT NULL DEFAULT FALSE,
    CHECK (is_current = 0 OR end_date IS NULL)
);

CREATE TABLE job_technologies (
    job_id INTEGER NOT NULL,
    technology_id INTEGER NOT NULL,
    PRIMARY KEY (job_id, technology_id),
    FOREIGN KEY (job_id) REFERENCES jobs (id) ON DELETE CASCADE,
    FOREIGN KEY (technology_id) REFERENCES technologies (id) ON DELETE CASCADE
);

CREATE TABLE achievements (
    id INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    job_id INTEGER NOT NULL,
    FOREIGN KEY (job_id) REFERENCES jobs (id) ON DELETE CASCADE
);

CREATE INDEX idx_subcategories_category_id ON subcategories (category_id);
CREATE INDEX idx_technologies_subcategory_id ON technologies (subcategory_id);
CREATE INDEX idx_project_technologies_technology_id ON project_technologies (technology_id);
CREATE INDEX idx_job_technologies_technology_id ON job_technologies (technology_id);
CREATE INDEX idx_achievements_job_id ON achievements (job_id);
CREATE INDEX idx_jobs_start_date ON jobs (start_date DESC);
"#;
